//! Control channel packets: the connect handshake and out-of-band server
//! queries. All of them travel with the `CTL` flag and no sequence word.

use crate::protocol::{
    codec::{MessageReader, MessageWriter},
    constants::{
        CCREP_ACCEPT, CCREP_PLAYER_INFO, CCREP_REJECT, CCREP_RULE_INFO, CCREP_SERVER_INFO,
        CCREQ_CONNECT, CCREQ_PLAYER_INFO, CCREQ_RULE_INFO, CCREQ_SERVER_INFO, GAME_NAME,
        MAX_CONTROL_STRING, NET_PROTOCOL_VERSION,
    },
    packet::{DecodeError, Packet},
};

/// Writes `s` cut to `MAX_CONTROL_STRING` bytes on a char boundary.
fn write_field(dst: &mut MessageWriter, s: &str) {
    let mut end = s.len().min(MAX_CONTROL_STRING);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    dst.write_string(&s[..end]);
}

/// Client asks the listen server for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub game: String,
    pub protocol_version: u8,
}

impl ConnectRequest {
    /// Request carrying our game name and protocol version.
    pub fn current() -> Self {
        Self {
            game: GAME_NAME.to_string(),
            protocol_version: NET_PROTOCOL_VERSION,
        }
    }
}

impl Packet for ConnectRequest {
    const ID: u8 = CCREQ_CONNECT;

    fn encode_body(&self, dst: &mut MessageWriter) {
        write_field(dst, &self.game);
        dst.write_byte(self.protocol_version);
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        Ok(Self {
            game: src.read_string()?,
            protocol_version: src.read_byte()?,
        })
    }
}

/// Server browser query for host name, map and player counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfoRequest {
    pub game: String,
    pub protocol_version: u8,
}

impl ServerInfoRequest {
    pub fn current() -> Self {
        Self {
            game: GAME_NAME.to_string(),
            protocol_version: NET_PROTOCOL_VERSION,
        }
    }
}

impl Packet for ServerInfoRequest {
    const ID: u8 = CCREQ_SERVER_INFO;

    fn encode_body(&self, dst: &mut MessageWriter) {
        write_field(dst, &self.game);
        dst.write_byte(self.protocol_version);
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        Ok(Self {
            game: src.read_string()?,
            protocol_version: src.read_byte()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfoRequest {
    pub player: u8,
}

impl Packet for PlayerInfoRequest {
    const ID: u8 = CCREQ_PLAYER_INFO;

    fn encode_body(&self, dst: &mut MessageWriter) {
        dst.write_byte(self.player);
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        Ok(Self {
            player: src.read_byte()?,
        })
    }
}

/// Asks for the rule following `previous`; an empty name asks for the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfoRequest {
    pub previous: String,
}

impl Packet for RuleInfoRequest {
    const ID: u8 = CCREQ_RULE_INFO;

    fn encode_body(&self, dst: &mut MessageWriter) {
        write_field(dst, &self.previous);
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        Ok(Self {
            previous: src.read_string()?,
        })
    }
}

/// Connection accepted; the session continues on `port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accept {
    pub port: u32,
}

impl Packet for Accept {
    const ID: u8 = CCREP_ACCEPT;

    fn encode_body(&self, dst: &mut MessageWriter) {
        dst.write_long(self.port as i32);
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        Ok(Self {
            port: src.read_long()? as u32,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reject {
    pub reason: String,
}

impl Packet for Reject {
    const ID: u8 = CCREP_REJECT;

    fn encode_body(&self, dst: &mut MessageWriter) {
        write_field(dst, &self.reason);
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: src.read_string()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfoReply {
    pub address: String,
    pub hostname: String,
    pub level: String,
    pub players: u8,
    pub max_players: u8,
    pub protocol_version: u8,
}

impl Packet for ServerInfoReply {
    const ID: u8 = CCREP_SERVER_INFO;

    fn encode_body(&self, dst: &mut MessageWriter) {
        write_field(dst, &self.address);
        write_field(dst, &self.hostname);
        write_field(dst, &self.level);
        dst.write_byte(self.players);
        dst.write_byte(self.max_players);
        dst.write_byte(self.protocol_version);
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        Ok(Self {
            address: src.read_string()?,
            hostname: src.read_string()?,
            level: src.read_string()?,
            players: src.read_byte()?,
            max_players: src.read_byte()?,
            protocol_version: src.read_byte()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerInfoReply {
    pub player: u8,
    pub name: String,
    pub colors: i32,
    pub frags: i32,
    /// Seconds since the player connected.
    pub connect_time: i32,
    pub address: String,
}

impl Packet for PlayerInfoReply {
    const ID: u8 = CCREP_PLAYER_INFO;

    fn encode_body(&self, dst: &mut MessageWriter) {
        dst.write_byte(self.player);
        write_field(dst, &self.name);
        dst.write_long(self.colors);
        dst.write_long(self.frags);
        dst.write_long(self.connect_time);
        write_field(dst, &self.address);
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        Ok(Self {
            player: src.read_byte()?,
            name: src.read_string()?,
            colors: src.read_long()?,
            frags: src.read_long()?,
            connect_time: src.read_long()?,
            address: src.read_string()?,
        })
    }
}

/// One server rule, or `None` once the list is exhausted (empty body).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleInfoReply {
    pub rule: Option<(String, String)>,
}

impl Packet for RuleInfoReply {
    const ID: u8 = CCREP_RULE_INFO;

    fn encode_body(&self, dst: &mut MessageWriter) {
        if let Some((name, value)) = &self.rule {
            write_field(dst, name);
            write_field(dst, value);
        }
    }

    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError> {
        if src.is_empty() {
            return Ok(Self { rule: None });
        }
        let name = src.read_string()?;
        let value = src.read_string()?;
        Ok(Self {
            rule: Some((name, value)),
        })
    }
}
