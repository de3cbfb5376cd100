//! The five logical messages of the biome protocol.
//!
//! These types are the same no matter which wire generation carries them.
//! Field names in the serde derives follow the camelCase names the remote
//! world generator uses, so the JSON generation is wire-compatible.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{MessageKind, ProtocolError};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A biome identifier as assigned by the remote generator.
///
/// Serialized as the bare integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BiomeId(pub i32);

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "biome-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Biome data
// ---------------------------------------------------------------------------

/// Asks for the biome ids of a rectangle of the world.
///
/// `x` and `y` are in block coordinates, or quarter-resolution cells when
/// `quarter_resolution` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiomeDataRequest {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub quarter_resolution: bool,
}

impl BiomeDataRequest {
    /// Builds a request, rejecting empty or negative rectangles.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if `width` or `height` is not
    /// positive.
    pub fn new(
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        quarter_resolution: bool,
    ) -> Result<Self, ProtocolError> {
        if width <= 0 || height <= 0 {
            return Err(ProtocolError::InvalidMessage(format!(
                "biome data request needs positive dimensions, got {width}x{height}"
            )));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
            quarter_resolution,
        })
    }

    /// Number of biome ids a conforming response carries.
    pub fn expected_len(&self) -> usize {
        let width = usize::try_from(self.width).unwrap_or(0);
        let height = usize::try_from(self.height).unwrap_or(0);
        width.saturating_mul(height)
    }
}

/// Row-major biome ids for the requested rectangle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BiomeDataResponse {
    pub data: Vec<i32>,
}

// ---------------------------------------------------------------------------
// World creation
// ---------------------------------------------------------------------------

/// World generation presets.
///
/// On the wire this is a string. Names this side does not know decode to
/// [`WorldType::Unknown`] instead of failing, so a newer generator cannot
/// break an older client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum WorldType {
    #[default]
    Default,
    Flat,
    LargeBiomes,
    Amplified,
    Customized,
    Unknown,
}

impl WorldType {
    pub const ALL: [WorldType; 6] = [
        Self::Default,
        Self::Flat,
        Self::LargeBiomes,
        Self::Amplified,
        Self::Customized,
        Self::Unknown,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Flat => "FLAT",
            Self::LargeBiomes => "LARGE_BIOMES",
            Self::Amplified => "AMPLIFIED",
            Self::Customized => "CUSTOMIZED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive; anything unrecognised is `Unknown`.
    pub fn from_wire_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|ty| ty.wire_name().eq_ignore_ascii_case(name))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for WorldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for WorldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_wire_name(s))
    }
}

impl From<String> for WorldType {
    fn from(name: String) -> Self {
        Self::from_wire_name(&name)
    }
}

impl From<WorldType> for String {
    fn from(ty: WorldType) -> Self {
        ty.wire_name().to_string()
    }
}

/// Tells the generator to start a new world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorldRequest {
    pub seed: i64,
    pub world_type: WorldType,
    pub generator_options: String,
}

// ---------------------------------------------------------------------------
// Biome list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiomeListEntry {
    pub biome_id: BiomeId,
    pub biome_name: String,
}

impl BiomeListEntry {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            biome_id: BiomeId(id),
            biome_name: name.into(),
        }
    }
}

/// Every biome the generator can produce, in the generator's order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BiomeListResponse {
    pub biomes: Vec<BiomeListEntry>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Any one of the five protocol messages.
///
/// `BiomeListRequest` has no fields, so it is a unit variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    BiomeDataRequest(BiomeDataRequest),
    BiomeDataResponse(BiomeDataResponse),
    CreateWorldRequest(CreateWorldRequest),
    BiomeListRequest,
    BiomeListResponse(BiomeListResponse),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::BiomeDataRequest(_) => MessageKind::BiomeDataRequest,
            Self::BiomeDataResponse(_) => MessageKind::BiomeDataResponse,
            Self::CreateWorldRequest(_) => MessageKind::CreateWorldRequest,
            Self::BiomeListRequest => MessageKind::BiomeListRequest,
            Self::BiomeListResponse(_) => MessageKind::BiomeListResponse,
        }
    }
}

impl From<BiomeDataRequest> for Message {
    fn from(request: BiomeDataRequest) -> Self {
        Self::BiomeDataRequest(request)
    }
}

impl From<BiomeDataResponse> for Message {
    fn from(response: BiomeDataResponse) -> Self {
        Self::BiomeDataResponse(response)
    }
}

impl From<CreateWorldRequest> for Message {
    fn from(request: CreateWorldRequest) -> Self {
        Self::CreateWorldRequest(request)
    }
}

impl From<BiomeListResponse> for Message {
    fn from(response: BiomeListResponse) -> Self {
        Self::BiomeListResponse(response)
    }
}
