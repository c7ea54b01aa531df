use serde::de::Deserializer;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::core::{digest_hex, Error, Result};

/// Number of positional sensor channels in a chunk.
pub const CHANNEL_COUNT: usize = 6;

const CHANNEL_KEYS: [&str; CHANNEL_COUNT] = ["0", "1", "2", "3", "4", "5"];

/// Samples of one sensor channel, one sequence per axis.
///
/// Axes are expected to share a length but nothing enforces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    #[serde(default, deserialize_with = "nullable_samples")]
    pub x: Vec<f64>,
    #[serde(default, deserialize_with = "nullable_samples")]
    pub y: Vec<f64>,
    #[serde(default, deserialize_with = "nullable_samples")]
    pub z: Vec<f64>,
}

impl SensorData {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        Self { x, y, z }
    }

    /// Axes in canonical X, Y, Z order.
    pub fn axes(&self) -> [&[f64]; 3] {
        [&self.x, &self.y, &self.z]
    }
}

/// One chunk: an id and six positionally addressed sensor channels.
///
/// Canonical JSON keys are `id` followed by `"0"` through `"5"`; each channel
/// serializes `x`, `y`, `z` in that order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "ChunkDataWire")]
pub struct ChunkData {
    pub id: String,
    pub channels: [SensorData; CHANNEL_COUNT],
}

impl ChunkData {
    pub fn new(id: impl Into<String>, channels: [SensorData; CHANNEL_COUNT]) -> Self {
        Self {
            id: id.into(),
            channels,
        }
    }

    /// Canonical compact JSON bytes, the input of [`ChunkData::hash`].
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|err| Error::Encode(format!("unable to serialize chunk {}: {err}", self.id)))
    }

    /// Integrity digest of the canonical serialization.
    pub fn hash(&self) -> Result<String> {
        Ok(digest_hex(&self.canonical_bytes()?))
    }
}

impl Serialize for ChunkData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChunkData", 1 + CHANNEL_COUNT)?;
        state.serialize_field("id", &self.id)?;
        for (key, channel) in CHANNEL_KEYS.iter().zip(self.channels.iter()) {
            state.serialize_field(*key, channel)?;
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct ChunkDataWire {
    #[serde(default)]
    id: String,
    #[serde(rename = "0", default)]
    sensor0: SensorData,
    #[serde(rename = "1", default)]
    sensor1: SensorData,
    #[serde(rename = "2", default)]
    sensor2: SensorData,
    #[serde(rename = "3", default)]
    sensor3: SensorData,
    #[serde(rename = "4", default)]
    sensor4: SensorData,
    #[serde(rename = "5", default)]
    sensor5: SensorData,
}

impl From<ChunkDataWire> for ChunkData {
    fn from(wire: ChunkDataWire) -> Self {
        Self {
            id: wire.id,
            channels: [
                wire.sensor0,
                wire.sensor1,
                wire.sensor2,
                wire.sensor3,
                wire.sensor4,
                wire.sensor5,
            ],
        }
    }
}

// `null` decodes to an empty sequence, matching producers that emit nil arrays.
fn nullable_samples<'de, D>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<f64>>::deserialize(deserializer)?.unwrap_or_default())
}
