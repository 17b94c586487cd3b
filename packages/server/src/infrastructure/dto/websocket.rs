//! WebSocket envelope DTOs and codec.
//!
//! Wire shape (JSON, one envelope per frame):
//!
//! ```text
//! {"sender_id": 2, "payload": {"type": "chat", "msg": "hello"}}
//! {"sender_id": 0, "payload": {"type": "id", "id": 3}}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ClientId, Packet, Payload};

/// Envelope codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode packet: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode packet: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Payload as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PayloadDto {
    Chat { msg: String },
    Id { id: u64 },
}

/// Envelope as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketDto {
    #[serde(default)]
    pub sender_id: u64,
    pub payload: PayloadDto,
}

impl From<Payload> for PayloadDto {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Chat { msg } => Self::Chat { msg },
            Payload::Id { id } => Self::Id { id: id.value() },
        }
    }
}

impl From<PayloadDto> for Payload {
    fn from(dto: PayloadDto) -> Self {
        match dto {
            PayloadDto::Chat { msg } => Self::Chat { msg },
            PayloadDto::Id { id } => Self::Id {
                id: ClientId::new(id),
            },
        }
    }
}

impl From<Packet> for PacketDto {
    fn from(packet: Packet) -> Self {
        Self {
            sender_id: packet.sender_id.value(),
            payload: packet.payload.into(),
        }
    }
}

impl From<PacketDto> for Packet {
    fn from(dto: PacketDto) -> Self {
        Self::new(ClientId::new(dto.sender_id), dto.payload.into())
    }
}

/// Serialize a packet into one frame's bytes
pub fn encode_packet(packet: Packet) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&PacketDto::from(packet)).map_err(CodecError::Encode)
}

/// Parse one frame's bytes into a packet
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, CodecError> {
    serde_json::from_slice::<PacketDto>(bytes)
        .map(Packet::from)
        .map_err(CodecError::Decode)
}
