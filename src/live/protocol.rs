// src/live/protocol.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames sent by a connected client.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Invite { to_user_id: i64, quiz_id: i64 },
    Accept { challenge_id: Uuid },
    Decline { challenge_id: Uuid },
    Cancel { challenge_id: Uuid },
    Finish {
        challenge_id: Uuid,
        score: i32,
        duration_secs: i32,
    },
    RoomMessage { challenge_id: Uuid, text: String },
    Ping,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PresenceEntry {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlayerScore {
    pub user_id: i64,
    pub score: Option<i32>,
    pub duration_secs: Option<i32>,
}

/// Frames pushed to clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Presence {
        online: Vec<PresenceEntry>,
    },
    ChallengeInvite {
        challenge_id: Uuid,
        from: PresenceEntry,
        quiz_id: i64,
    },
    ChallengeDeclined {
        challenge_id: Uuid,
    },
    ChallengeCancelled {
        challenge_id: Uuid,
    },
    ChallengeStart {
        challenge_id: Uuid,
        room: String,
        quiz_id: i64,
        opponent: PresenceEntry,
    },
    OpponentFinished {
        challenge_id: Uuid,
    },
    ChallengeResult {
        challenge_id: Uuid,
        winner_id: Option<i64>,
        forfeit: bool,
        scores: Vec<PlayerScore>,
    },
    RoomMessage {
        challenge_id: Uuid,
        from: i64,
        text: String,
    },
    Error {
        message: String,
    },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_client_frames() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"invite","to_user_id":7,"quiz_id":3}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Invite {
                to_user_id: 7,
                quiz_id: 3
            }
        );

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }

    #[test]
    fn rejects_unknown_frames() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn server_frames_carry_type_tag() {
        let json = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(json["type"], "pong");

        let json = serde_json::to_value(ServerMessage::Error {
            message: "nope".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "nope");
    }
}
