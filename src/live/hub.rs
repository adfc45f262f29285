// src/live/hub.rs

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::live::protocol::{PlayerScore, PresenceEntry, ServerMessage};

/// Handle used to push frames to a connected socket.
#[derive(Debug, Clone)]
struct Connection {
    conn_id: Uuid,
    username: String,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Finish {
    score: i32,
    duration_secs: i32,
}

#[derive(Debug, Clone)]
struct Challenge {
    quiz_id: i64,
    challenger_id: i64,
    opponent_id: i64,
    phase: Phase,
    challenger_finish: Option<Finish>,
    opponent_finish: Option<Finish>,
}

impl Challenge {
    fn involves(&self, user_id: i64) -> bool {
        self.challenger_id == user_id || self.opponent_id == user_id
    }

    fn other(&self, user_id: i64) -> i64 {
        if self.challenger_id == user_id {
            self.opponent_id
        } else {
            self.challenger_id
        }
    }

    fn scores(&self) -> Vec<PlayerScore> {
        [
            (self.challenger_id, self.challenger_finish),
            (self.opponent_id, self.opponent_finish),
        ]
        .into_iter()
        .map(|(user_id, finish)| PlayerScore {
            user_id,
            score: finish.map(|f| f.score),
            duration_secs: finish.map(|f| f.duration_secs),
        })
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Forfeit,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Draw => "draw",
            Outcome::Forfeit => "forfeit",
        }
    }
}

/// A challenge that left the hub with a result worth recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeOutcome {
    pub challenge_id: Uuid,
    pub quiz_id: i64,
    pub challenger_id: i64,
    pub opponent_id: i64,
    pub challenger_score: Option<i32>,
    pub opponent_score: Option<i32>,
    pub winner_id: Option<i64>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveError {
    UserOffline,
    SelfChallenge,
    UnknownChallenge,
    NotAllowed,
    WrongPhase,
    AlreadyFinished,
}

impl LiveError {
    pub fn message(&self) -> &'static str {
        match self {
            LiveError::UserOffline => "User is not online",
            LiveError::SelfChallenge => "You cannot challenge yourself",
            LiveError::UnknownChallenge => "Challenge not found",
            LiveError::NotAllowed => "You are not allowed to do that in this challenge",
            LiveError::WrongPhase => "Challenge is not in the right state for that",
            LiveError::AlreadyFinished => "You already finished this challenge",
        }
    }
}

impl std::fmt::Display for LiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for LiveError {}

/// Higher score wins; equal scores go to the faster player; otherwise a draw.
fn decide_winner(a: (i64, Finish), b: (i64, Finish)) -> Option<i64> {
    let (a_id, a) = a;
    let (b_id, b) = b;
    match a.score.cmp(&b.score) {
        std::cmp::Ordering::Greater => Some(a_id),
        std::cmp::Ordering::Less => Some(b_id),
        std::cmp::Ordering::Equal => match a.duration_secs.cmp(&b.duration_secs) {
            std::cmp::Ordering::Less => Some(a_id),
            std::cmp::Ordering::Greater => Some(b_id),
            std::cmp::Ordering::Equal => None,
        },
    }
}

/// Registry of connected users and in-flight challenges.
///
/// One connection per user: a newer socket replaces the older one, whose
/// outbound channel is dropped so its writer task ends.
#[derive(Debug, Default)]
pub struct LiveHub {
    connections: DashMap<i64, Connection>,
    challenges: DashMap<Uuid, Challenge>,
}

impl LiveHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a socket for `user_id` and broadcasts presence.
    pub fn connect(
        &self,
        user_id: i64,
        username: &str,
    ) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        let replaced = self.connections.insert(
            user_id,
            Connection {
                conn_id,
                username: username.to_string(),
                tx,
            },
        );
        if replaced.is_some() {
            tracing::debug!(user_id, "live connection replaced by a newer socket");
        }
        self.broadcast_presence();
        (conn_id, rx)
    }

    /// Removes the socket `conn_id` of `user_id`, if it is still the current one.
    ///
    /// Pending challenges involving the user are cancelled and active ones are
    /// forfeited in favour of the opponent. The forfeits are returned so the
    /// caller can record them.
    pub fn disconnect(&self, user_id: i64, conn_id: Uuid) -> Vec<ChallengeOutcome> {
        if self
            .connections
            .remove_if(&user_id, |_, conn| conn.conn_id == conn_id)
            .is_none()
        {
            return Vec::new();
        }

        let involved: Vec<Uuid> = self
            .challenges
            .iter()
            .filter(|entry| entry.value().involves(user_id))
            .map(|entry| *entry.key())
            .collect();

        let mut outcomes = Vec::new();
        for id in involved {
            let Some((_, challenge)) = self.challenges.remove(&id) else {
                continue;
            };
            let other = challenge.other(user_id);
            match challenge.phase {
                Phase::Pending => {
                    self.send(other, ServerMessage::ChallengeCancelled { challenge_id: id });
                }
                Phase::Active => {
                    self.send(
                        other,
                        ServerMessage::ChallengeResult {
                            challenge_id: id,
                            winner_id: Some(other),
                            forfeit: true,
                            scores: challenge.scores(),
                        },
                    );
                    outcomes.push(ChallengeOutcome {
                        challenge_id: id,
                        quiz_id: challenge.quiz_id,
                        challenger_id: challenge.challenger_id,
                        opponent_id: challenge.opponent_id,
                        challenger_score: challenge.challenger_finish.map(|f| f.score),
                        opponent_score: challenge.opponent_finish.map(|f| f.score),
                        winner_id: Some(other),
                        outcome: Outcome::Forfeit,
                    });
                }
            }
        }

        self.broadcast_presence();
        outcomes
    }

    pub fn is_online(&self, user_id: i64) -> bool {
        self.connections.contains_key(&user_id)
    }

    pub fn online_users(&self) -> Vec<PresenceEntry> {
        let mut online: Vec<PresenceEntry> = self
            .connections
            .iter()
            .map(|entry| PresenceEntry {
                user_id: *entry.key(),
                username: entry.value().username.clone(),
            })
            .collect();
        online.sort_by_key(|p| p.user_id);
        online
    }

    /// Pushes a frame to a user; silently dropped if they are offline.
    pub fn send(&self, user_id: i64, msg: ServerMessage) {
        if let Some(conn) = self.connections.get(&user_id) {
            let _ = conn.tx.send(msg);
        }
    }

    fn broadcast_presence(&self) {
        let msg = ServerMessage::Presence {
            online: self.online_users(),
        };
        let senders: Vec<_> = self
            .connections
            .iter()
            .map(|entry| entry.value().tx.clone())
            .collect();
        for tx in senders {
            let _ = tx.send(msg.clone());
        }
    }

    fn presence_of(&self, user_id: i64) -> PresenceEntry {
        PresenceEntry {
            user_id,
            username: self
                .connections
                .get(&user_id)
                .map(|c| c.username.clone())
                .unwrap_or_default(),
        }
    }

    /// Sends an invite. A pending invite from the same challenger to the same
    /// target is replaced by this one.
    pub fn invite(&self, from: i64, to: i64, quiz_id: i64) -> Result<Uuid, LiveError> {
        if from == to {
            return Err(LiveError::SelfChallenge);
        }
        if !self.is_online(to) {
            return Err(LiveError::UserOffline);
        }

        let stale: Vec<Uuid> = self
            .challenges
            .iter()
            .filter(|entry| {
                let c = entry.value();
                c.phase == Phase::Pending && c.challenger_id == from && c.opponent_id == to
            })
            .map(|entry| *entry.key())
            .collect();
        for id in stale {
            if self.challenges.remove(&id).is_some() {
                self.send(to, ServerMessage::ChallengeCancelled { challenge_id: id });
            }
        }

        let challenge_id = Uuid::new_v4();
        self.challenges.insert(
            challenge_id,
            Challenge {
                quiz_id,
                challenger_id: from,
                opponent_id: to,
                phase: Phase::Pending,
                challenger_finish: None,
                opponent_finish: None,
            },
        );

        self.send(
            to,
            ServerMessage::ChallengeInvite {
                challenge_id,
                from: self.presence_of(from),
                quiz_id,
            },
        );
        Ok(challenge_id)
    }

    /// The invitee accepts; both players are put in the challenge room.
    pub fn accept(&self, user_id: i64, challenge_id: Uuid) -> Result<(), LiveError> {
        let (challenger_id, quiz_id) = {
            let mut challenge = self
                .challenges
                .get_mut(&challenge_id)
                .ok_or(LiveError::UnknownChallenge)?;
            if challenge.opponent_id != user_id {
                return Err(LiveError::NotAllowed);
            }
            if challenge.phase != Phase::Pending {
                return Err(LiveError::WrongPhase);
            }
            challenge.phase = Phase::Active;
            (challenge.challenger_id, challenge.quiz_id)
        };

        let room = format!("challenge:{challenge_id}");
        self.send(
            challenger_id,
            ServerMessage::ChallengeStart {
                challenge_id,
                room: room.clone(),
                quiz_id,
                opponent: self.presence_of(user_id),
            },
        );
        self.send(
            user_id,
            ServerMessage::ChallengeStart {
                challenge_id,
                room,
                quiz_id,
                opponent: self.presence_of(challenger_id),
            },
        );
        Ok(())
    }

    /// The invitee turns a pending challenge down.
    pub fn decline(&self, user_id: i64, challenge_id: Uuid) -> Result<(), LiveError> {
        let (_, challenge) = self
            .challenges
            .remove_if(&challenge_id, |_, c| {
                c.opponent_id == user_id && c.phase == Phase::Pending
            })
            .ok_or_else(|| self.explain(challenge_id, |c| c.opponent_id == user_id))?;
        self.send(
            challenge.challenger_id,
            ServerMessage::ChallengeDeclined { challenge_id },
        );
        Ok(())
    }

    /// The challenger withdraws a pending invite.
    pub fn cancel(&self, user_id: i64, challenge_id: Uuid) -> Result<(), LiveError> {
        let (_, challenge) = self
            .challenges
            .remove_if(&challenge_id, |_, c| {
                c.challenger_id == user_id && c.phase == Phase::Pending
            })
            .ok_or_else(|| self.explain(challenge_id, |c| c.challenger_id == user_id))?;
        self.send(
            challenge.opponent_id,
            ServerMessage::ChallengeCancelled { challenge_id },
        );
        Ok(())
    }

    /// Works out why a conditional removal did not happen.
    fn explain(&self, challenge_id: Uuid, allowed: impl Fn(&Challenge) -> bool) -> LiveError {
        match self.challenges.get(&challenge_id) {
            None => LiveError::UnknownChallenge,
            Some(c) if !allowed(c.value()) => LiveError::NotAllowed,
            Some(_) => LiveError::WrongPhase,
        }
    }

    /// Records a participant's final score. Returns the outcome once both
    /// players have finished.
    pub fn finish(
        &self,
        user_id: i64,
        challenge_id: Uuid,
        score: i32,
        duration_secs: i32,
    ) -> Result<Option<ChallengeOutcome>, LiveError> {
        let finish = Finish {
            score: score.clamp(0, 100),
            duration_secs: duration_secs.max(0),
        };

        let (other, both_done) = {
            let mut challenge = self
                .challenges
                .get_mut(&challenge_id)
                .ok_or(LiveError::UnknownChallenge)?;
            if !challenge.involves(user_id) {
                return Err(LiveError::NotAllowed);
            }
            if challenge.phase != Phase::Active {
                return Err(LiveError::WrongPhase);
            }
            let slot = if challenge.challenger_id == user_id {
                &mut challenge.challenger_finish
            } else {
                &mut challenge.opponent_finish
            };
            if slot.is_some() {
                return Err(LiveError::AlreadyFinished);
            }
            *slot = Some(finish);
            (
                challenge.other(user_id),
                challenge.challenger_finish.is_some() && challenge.opponent_finish.is_some(),
            )
        };

        if !both_done {
            self.send(other, ServerMessage::OpponentFinished { challenge_id });
            return Ok(None);
        }

        let Some((_, challenge)) = self.challenges.remove(&challenge_id) else {
            // Another task resolved it first.
            return Ok(None);
        };
        let (Some(a), Some(b)) = (challenge.challenger_finish, challenge.opponent_finish) else {
            return Ok(None);
        };

        let winner_id = decide_winner((challenge.challenger_id, a), (challenge.opponent_id, b));
        let result = ServerMessage::ChallengeResult {
            challenge_id,
            winner_id,
            forfeit: false,
            scores: challenge.scores(),
        };
        self.send(challenge.challenger_id, result.clone());
        self.send(challenge.opponent_id, result);

        Ok(Some(ChallengeOutcome {
            challenge_id,
            quiz_id: challenge.quiz_id,
            challenger_id: challenge.challenger_id,
            opponent_id: challenge.opponent_id,
            challenger_score: Some(a.score),
            opponent_score: Some(b.score),
            winner_id,
            outcome: if winner_id.is_some() {
                Outcome::Win
            } else {
                Outcome::Draw
            },
        }))
    }

    /// Relays a chat line to the other participant of an active challenge.
    pub fn room_message(&self, user_id: i64, challenge_id: Uuid, text: &str) -> Result<(), LiveError> {
        let other = {
            let challenge = self
                .challenges
                .get(&challenge_id)
                .ok_or(LiveError::UnknownChallenge)?;
            if !challenge.involves(user_id) {
                return Err(LiveError::NotAllowed);
            }
            if challenge.phase != Phase::Active {
                return Err(LiveError::WrongPhase);
            }
            challenge.other(user_id)
        };
        self.send(
            other,
            ServerMessage::RoomMessage {
                challenge_id,
                from: user_id,
                text: text.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn without_presence(msgs: Vec<ServerMessage>) -> Vec<ServerMessage> {
        msgs.into_iter()
            .filter(|m| !matches!(m, ServerMessage::Presence { .. }))
            .collect()
    }

    /// Two connected players with empty inboxes.
    fn pair(hub: &LiveHub) -> (
        (Uuid, mpsc::UnboundedReceiver<ServerMessage>),
        (Uuid, mpsc::UnboundedReceiver<ServerMessage>),
    ) {
        let mut a = hub.connect(1, "alice");
        let mut b = hub.connect(2, "bob");
        drain(&mut a.1);
        drain(&mut b.1);
        (a, b)
    }

    #[test]
    fn presence_is_broadcast_on_connect_and_disconnect() {
        let hub = LiveHub::new();
        let (_, mut a_rx) = hub.connect(1, "alice");
        let (b_conn, _b_rx) = hub.connect(2, "bob");

        let msgs = drain(&mut a_rx);
        let last = msgs.last().unwrap();
        assert_eq!(
            last,
            &ServerMessage::Presence {
                online: vec![
                    PresenceEntry { user_id: 1, username: "alice".into() },
                    PresenceEntry { user_id: 2, username: "bob".into() },
                ]
            }
        );

        hub.disconnect(2, b_conn);
        let msgs = drain(&mut a_rx);
        assert_eq!(
            msgs,
            vec![ServerMessage::Presence {
                online: vec![PresenceEntry { user_id: 1, username: "alice".into() }]
            }]
        );
    }

    #[test]
    fn newer_connection_replaces_older() {
        let hub = LiveHub::new();
        let (old_conn, mut old_rx) = hub.connect(1, "alice");
        let (_new_conn, _new_rx) = hub.connect(1, "alice");

        drain(&mut old_rx);
        // Old sender was dropped with the replaced entry.
        assert!(old_rx.try_recv().is_err());
        assert!(matches!(
            old_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));

        // Closing the stale socket must not log the user out.
        hub.disconnect(1, old_conn);
        assert!(hub.is_online(1));
    }

    #[test]
    fn invite_accept_finish_flow() {
        let hub = LiveHub::new();
        let ((_, mut a_rx), (_, mut b_rx)) = pair(&hub);

        let id = hub.invite(1, 2, 9).unwrap();
        assert_eq!(
            drain(&mut b_rx),
            vec![ServerMessage::ChallengeInvite {
                challenge_id: id,
                from: PresenceEntry { user_id: 1, username: "alice".into() },
                quiz_id: 9,
            }]
        );

        hub.accept(2, id).unwrap();
        let a_msgs = drain(&mut a_rx);
        let b_msgs = drain(&mut b_rx);
        assert!(matches!(
            &a_msgs[..],
            [ServerMessage::ChallengeStart { room, opponent, .. }]
                if room == &format!("challenge:{id}") && opponent.user_id == 2
        ));
        assert!(matches!(
            &b_msgs[..],
            [ServerMessage::ChallengeStart { opponent, .. }] if opponent.user_id == 1
        ));

        assert_eq!(hub.finish(1, id, 80, 50).unwrap(), None);
        assert_eq!(
            drain(&mut b_rx),
            vec![ServerMessage::OpponentFinished { challenge_id: id }]
        );
        assert_eq!(hub.finish(1, id, 90, 10), Err(LiveError::AlreadyFinished));

        let outcome = hub.finish(2, id, 70, 20).unwrap().unwrap();
        assert_eq!(outcome.winner_id, Some(1));
        assert_eq!(outcome.outcome, Outcome::Win);
        assert_eq!(outcome.challenger_score, Some(80));
        assert_eq!(outcome.opponent_score, Some(70));

        assert!(matches!(
            &drain(&mut a_rx)[..],
            [ServerMessage::ChallengeResult { winner_id: Some(1), forfeit: false, .. }]
        ));
        assert_eq!(hub.finish(2, id, 70, 20), Err(LiveError::UnknownChallenge));
    }

    #[test]
    fn ties_break_on_duration_then_draw() {
        let fast = Finish { score: 50, duration_secs: 10 };
        let slow = Finish { score: 50, duration_secs: 20 };
        assert_eq!(decide_winner((1, fast), (2, slow)), Some(1));
        assert_eq!(decide_winner((1, slow), (2, fast)), Some(2));
        assert_eq!(decide_winner((1, fast), (2, fast)), None);

        let hub = LiveHub::new();
        let _conns = pair(&hub);
        let id = hub.invite(1, 2, 1).unwrap();
        hub.accept(2, id).unwrap();
        hub.finish(1, id, 60, 30).unwrap();
        let outcome = hub.finish(2, id, 60, 30).unwrap().unwrap();
        assert_eq!(outcome.outcome, Outcome::Draw);
        assert_eq!(outcome.winner_id, None);
    }

    #[test]
    fn repeated_invite_replaces_pending_one() {
        let hub = LiveHub::new();
        let (_a, (_, mut b_rx)) = pair(&hub);

        let first = hub.invite(1, 2, 1).unwrap();
        let second = hub.invite(1, 2, 5).unwrap();
        assert_ne!(first, second);

        let msgs = drain(&mut b_rx);
        assert!(msgs.contains(&ServerMessage::ChallengeCancelled { challenge_id: first }));
        assert_eq!(hub.accept(2, first), Err(LiveError::UnknownChallenge));
        assert!(hub.accept(2, second).is_ok());
    }

    #[test]
    fn invite_guards() {
        let hub = LiveHub::new();
        let _a = hub.connect(1, "alice");
        assert_eq!(hub.invite(1, 1, 1), Err(LiveError::SelfChallenge));
        assert_eq!(hub.invite(1, 3, 1), Err(LiveError::UserOffline));
    }

    #[test]
    fn only_invitee_accepts_or_declines() {
        let hub = LiveHub::new();
        let ((_, mut a_rx), _b) = pair(&hub);
        let id = hub.invite(1, 2, 1).unwrap();

        assert_eq!(hub.accept(1, id), Err(LiveError::NotAllowed));
        assert_eq!(hub.decline(1, id), Err(LiveError::NotAllowed));
        assert_eq!(hub.cancel(2, id), Err(LiveError::NotAllowed));

        hub.decline(2, id).unwrap();
        assert_eq!(
            without_presence(drain(&mut a_rx)),
            vec![ServerMessage::ChallengeDeclined { challenge_id: id }]
        );
        assert_eq!(hub.decline(2, id), Err(LiveError::UnknownChallenge));
    }

    #[test]
    fn cannot_finish_or_chat_before_accept() {
        let hub = LiveHub::new();
        let _conns = pair(&hub);
        let id = hub.invite(1, 2, 1).unwrap();
        assert_eq!(hub.finish(1, id, 10, 10), Err(LiveError::WrongPhase));
        assert_eq!(hub.room_message(1, id, "hi"), Err(LiveError::WrongPhase));

        hub.accept(2, id).unwrap();
        assert_eq!(hub.cancel(1, id), Err(LiveError::WrongPhase));
        assert!(hub.room_message(1, id, "hi").is_ok());
        assert_eq!(hub.room_message(3, id, "hi"), Err(LiveError::NotAllowed));
    }

    #[test]
    fn disconnect_forfeits_active_and_cancels_pending() {
        let hub = LiveHub::new();
        let ((a_conn, _a_rx), (_, mut b_rx)) = pair(&hub);
        let _c = hub.connect(3, "carol");

        let active = hub.invite(1, 2, 1).unwrap();
        hub.accept(2, active).unwrap();
        let pending = hub.invite(1, 3, 1).unwrap();
        drain(&mut b_rx);

        let outcomes = hub.disconnect(1, a_conn);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].challenge_id, active);
        assert_eq!(outcomes[0].winner_id, Some(2));
        assert_eq!(outcomes[0].outcome, Outcome::Forfeit);

        assert!(matches!(
            &without_presence(drain(&mut b_rx))[..],
            [ServerMessage::ChallengeResult { winner_id: Some(2), forfeit: true, .. }]
        ));
        assert_eq!(hub.accept(3, pending), Err(LiveError::UnknownChallenge));
    }
}
