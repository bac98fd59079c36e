//! Domain types shared by every layer of the chess server: identifiers,
//! the room/game/user projections, and the client/server wire messages.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(UserId, "Opaque identifier for a user.");
string_id!(RoomId, "Opaque identifier for a room.");
string_id!(GameId, "Opaque identifier for a game.");

/// Reserved user id for the bot player. Recognized specially only by the
/// Bot Controller; the Game Service treats it as an ordinary participant.
pub const BOT_USER_ID: &str = "BOT";

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Offline,
    Online,
    Waiting,
    InGame,
    Disconnected,
}

/// Minimal projection of a user as seen by the core. The rest of the
/// profile (email, password, etc.) lives entirely in the external auth
/// surface and is never represented here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub status: UserStatus,
    pub elo: i32,
    pub banned: bool,
}

impl User {
    pub const DEFAULT_ELO: i32 = 1500;

    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            status: UserStatus::Offline,
            elo: Self::DEFAULT_ELO,
            banned: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomType {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Open,
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
    Unset,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
            Color::Unset => Color::Unset,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPlayer {
    pub user_id: UserId,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub room_type: RoomType,
    pub status: RoomStatus,
    pub players: Vec<RoomPlayer>,
    pub invite_code: Option<String>,
    pub created_at_ms: u64,
}

impl Room {
    pub fn is_full(&self) -> bool {
        self.players.len() >= 2
    }

    pub fn player_ids(&self) -> Vec<&UserId> {
        self.players.iter().map(|p| &p.user_id).collect()
    }

    pub fn has_player(&self, user_id: &UserId) -> bool {
        self.players.iter().any(|p| &p.user_id == user_id)
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    pub initial_secs: u64,
    pub increment_secs: u64,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self {
            initial_secs: 600,
            increment_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clocks {
    pub white_secs: u64,
    pub black_secs: u64,
}

impl Clocks {
    pub fn for_color(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_secs,
            Color::Black => self.black_secs,
            Color::Unset => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    pub san: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub author_user_id: UserId,
    pub text: String,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Active,
    Completed,
    Draw,
    Resigned,
    Abandoned,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePlayer {
    pub user_id: UserId,
    pub color: Color,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub room_id: RoomId,
    pub position: String,
    pub move_history: Vec<MoveRecord>,
    pub clocks: Clocks,
    pub time_control: TimeControl,
    pub status: GameStatus,
    pub players: [GamePlayer; 2],
    pub chat: Vec<ChatEntry>,
    pub winner_user_id: Option<UserId>,
    pub created_at_ms: u64,
}

impl Game {
    pub fn player(&self, color: Color) -> &GamePlayer {
        self.players
            .iter()
            .find(|p| p.color == color)
            .expect("every game has exactly one player of each color")
    }

    pub fn color_of(&self, user_id: &UserId) -> Option<Color> {
        self.players
            .iter()
            .find(|p| &p.user_id == user_id)
            .map(|p| p.color)
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.players.iter().any(|p| &p.user_id == user_id)
    }

    pub fn opponent_of(&self, user_id: &UserId) -> Option<&UserId> {
        self.players
            .iter()
            .find(|p| &p.user_id != user_id)
            .map(|p| &p.user_id)
    }
}

// ---------------------------------------------------------------------------
// Wire messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePayload {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
}

/// Messages a client may send, tagged by `type` exactly as the wire
/// protocol specifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "CREATE_ROOM")]
    CreateRoom {
        room_type: RoomType,
        invite_code: Option<String>,
    },
    #[serde(rename = "JOIN_ROOM")]
    JoinRoom {
        room_id: RoomId,
        invite_code: Option<String>,
    },
    #[serde(rename = "LEAVE_ROOM")]
    LeaveRoom { room_id: RoomId },
    #[serde(rename = "JOIN_QUEUE")]
    JoinQueue { is_guest: bool },
    #[serde(rename = "LEAVE_QUEUE")]
    LeaveQueue,
    #[serde(rename = "REQUEST_REJOIN")]
    RequestRejoin { game_id: GameId },
    #[serde(rename = "MAKE_MOVE")]
    MakeMove {
        game_id: GameId,
        #[serde(flatten)]
        mv: MovePayload,
    },
    #[serde(rename = "GET_LEGAL_MOVES")]
    GetLegalMoves { game_id: GameId, square: String },
    #[serde(rename = "RESIGN")]
    Resign { game_id: GameId },
    #[serde(rename = "OFFER_DRAW")]
    OfferDraw { game_id: GameId },
    #[serde(rename = "ACCEPT_DRAW")]
    AcceptDraw { game_id: GameId },
    #[serde(rename = "DECLINE_DRAW")]
    DeclineDraw { game_id: GameId },
    #[serde(rename = "CHAT_MESSAGE")]
    ChatMessage { game_id: GameId, text: String },
    #[serde(rename = "TYPING")]
    Typing { game_id: GameId },
    #[serde(rename = "LOAD_GAME")]
    LoadGame { game_id: GameId },
}

/// Messages the server may send, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "ROOM_CREATED")]
    RoomCreated { room: Room },
    #[serde(rename = "ROOM_UPDATED")]
    RoomUpdated { room: Room, game: Option<Game> },
    #[serde(rename = "GAME_LOADED")]
    GameLoaded { game: Game },
    #[serde(rename = "GAME_UPDATED")]
    GameUpdated { game: Game },
    #[serde(rename = "REJOIN_GAME")]
    RejoinGame { game: Game },
    #[serde(rename = "LEGAL_MOVES_UPDATE")]
    LegalMovesUpdate { square: String, destinations: Vec<String> },
    #[serde(rename = "TIMER_UPDATE")]
    TimerUpdate {
        game_id: GameId,
        white_secs: u64,
        black_secs: u64,
    },
    #[serde(rename = "ILLEGAL_MOVE")]
    IllegalMove { reason: String, attempt_count: u32 },
    #[serde(rename = "PLAYER_RESIGNED")]
    PlayerResigned { display_name: String },
    #[serde(rename = "DRAW_OFFERED")]
    DrawOffered { from_user_id: UserId },
    #[serde(rename = "DRAW_OFFER_SENT")]
    DrawOfferSent,
    #[serde(rename = "DRAW_ACCEPTED")]
    DrawAccepted,
    #[serde(rename = "DRAW_DECLINED")]
    DrawDeclined,
    #[serde(rename = "TIME_OUT")]
    TimeOut { color: Color },
    #[serde(rename = "TYPING")]
    Typing { from_user_id: UserId },
    #[serde(rename = "QUEUE_TIMEOUT")]
    QueueTimeout,
    #[serde(rename = "QUEUE_LEFT")]
    QueueLeft,
    #[serde(rename = "LEAVE_ROOM")]
    LeaveRoom { room_id: RoomId },
    #[serde(rename = "GAME_NOT_FOUND")]
    GameNotFound { game_id: GameId },
    #[serde(rename = "INVALID_GAME_ID")]
    InvalidGameId { game_id: String },
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized { reason: String },
    #[serde(rename = "LOAD_GAME_ERROR")]
    LoadGameError { reason: String },
    #[serde(rename = "ERROR")]
    Error { message: String },
}

/// Close codes used when the Connection Registry terminates a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    Normal = 1000,
    AuthFailed = 4001,
    /// Same numeric class as `AuthFailed` — the source treats rate-limit
    /// closes as an alias of the auth-failure close code.
    RateLimitExceeded = 4001,
    InvalidMessage = 4002,
    NotFound = 4003,
    Unauthorized = 4004,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display_and_transparent_json() {
        let id = UserId::from("u-1");
        assert_eq!(id.to_string(), "u-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u-1\"");
    }

    #[test]
    fn test_color_opposite() {
        assert_eq!(Color::White.opposite(), Color::Black);
        assert_eq!(Color::Black.opposite(), Color::White);
    }

    #[test]
    fn test_game_status_is_terminal() {
        assert!(!GameStatus::Active.is_terminal());
        assert!(GameStatus::Completed.is_terminal());
        assert!(GameStatus::Draw.is_terminal());
        assert!(GameStatus::Resigned.is_terminal());
        assert!(GameStatus::Abandoned.is_terminal());
    }

    #[test]
    fn test_client_message_make_move_round_trip() {
        let msg = ClientMessage::MakeMove {
            game_id: GameId::from("g1"),
            mv: MovePayload {
                from: "e2".into(),
                to: "e4".into(),
                promotion: None,
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "MAKE_MOVE");
        let back: ClientMessage = serde_json::from_value(json).unwrap();
        match back {
            ClientMessage::MakeMove { game_id, mv } => {
                assert_eq!(game_id.as_str(), "g1");
                assert_eq!(mv.from, "e2");
                assert_eq!(mv.to, "e4");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_server_message_error_shape() {
        let msg = ServerMessage::Error {
            message: "bad request".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["payload"]["message"], "bad request");
    }

    #[test]
    fn test_room_has_player_and_is_full() {
        let room = Room {
            id: RoomId::from("r1"),
            room_type: RoomType::Public,
            status: RoomStatus::Open,
            players: vec![RoomPlayer {
                user_id: UserId::from("u1"),
                color: Color::Unset,
            }],
            invite_code: None,
            created_at_ms: 0,
        };
        assert!(room.has_player(&UserId::from("u1")));
        assert!(!room.is_full());
    }
}
