//! Chat service: validates and rate-limits messages, then routes
//! persistence through the owning game's actor so chat history and game
//! state are never written by two different single-writers at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chess_game::{GameEvents, GameManager};
use chess_protocol::{ChatEntry, GameId, UserId};
use chess_rules::RulesOracle;
use chess_store::{DurableStore, HotStore};
use tokio::sync::Mutex;

use crate::{ChatConfig, ChatError, ChatEvents, ChatRateLimiter};

pub struct ChatService<R: RulesOracle, H: HotStore, D: DurableStore, GE: GameEvents, E: ChatEvents> {
    games: Arc<GameManager<R, H, D, GE>>,
    events: Arc<E>,
    config: ChatConfig,
    limiters: Mutex<HashMap<UserId, ChatRateLimiter>>,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl<R: RulesOracle, H: HotStore, D: DurableStore, GE: GameEvents, E: ChatEvents>
    ChatService<R, H, D, GE, E>
{
    pub fn new(games: Arc<GameManager<R, H, D, GE>>, events: Arc<E>, config: ChatConfig) -> Self {
        Self {
            games,
            events,
            config,
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// `send`: validates length and rate limit, then appends the message
    /// through the owning game's single-writer actor.
    pub async fn send(&self, game_id: &GameId, user_id: UserId, text: String) -> Result<ChatEntry, ChatError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ChatError::Empty);
        }
        if text.chars().count() > self.config.max_message_len {
            return Err(ChatError::TooLong { max: self.config.max_message_len });
        }

        let allowed = {
            let mut limiters = self.limiters.lock().await;
            let limiter = limiters
                .entry(user_id.clone())
                .or_insert_with(|| ChatRateLimiter::new(self.config.rate_limit_max_messages, self.config.rate_limit_window));
            limiter.record(Instant::now())
        };
        if !allowed {
            return Err(ChatError::RateLimited(user_id));
        }

        let entry = ChatEntry {
            author_user_id: user_id,
            text,
            timestamp_ms: now_ms(),
        };
        self.games.append_chat(game_id, entry.clone()).await?;
        Ok(entry)
    }

    /// `typing`: relayed directly, never persisted or rate-limited — a
    /// burst of keystroke-driven typing events is expected traffic.
    pub async fn typing(&self, game_id: GameId, user_id: UserId, is_typing: bool) {
        self.events.on_typing(game_id, user_id, is_typing).await;
    }

    /// `history`: the chat log embedded in the game's current snapshot.
    pub async fn history(&self, game_id: &GameId) -> Result<Vec<ChatEntry>, ChatError> {
        Ok(self.games.snapshot(game_id).await?.chat)
    }

    pub async fn forget_limiter(&self, user_id: &UserId) {
        self.limiters.lock().await.remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_protocol::{Color, Room, RoomPlayer, RoomStatus, RoomType, TimeControl};
    use chess_rules::ShakmatyOracle;
    use chess_store::{InMemoryDurableStore, InMemoryHotStore};

    struct NoopGameEvents;
    impl GameEvents for NoopGameEvents {
        async fn on_state_changed(&self, _game: chess_protocol::Game) {}
        async fn on_invalid_move(&self, _game_id: GameId, _user_id: UserId, _reason: String, _attempt_count: u32) {}
        async fn on_draw_offered(&self, _game_id: GameId, _from_user_id: UserId) {}
        async fn on_draw_declined(&self, _game_id: GameId, _by_user_id: UserId) {}
        async fn on_chat_message(&self, _game_id: GameId, _entry: ChatEntry) {}
        async fn on_game_over(&self, _game: chess_protocol::Game, _room_id: chess_protocol::RoomId) {}
    }

    #[derive(Default)]
    struct RecordingChatEvents {
        typing_events: Mutex<Vec<(UserId, bool)>>,
    }
    impl ChatEvents for RecordingChatEvents {
        async fn on_typing(&self, _game_id: GameId, user_id: UserId, is_typing: bool) {
            self.typing_events.lock().await.push((user_id, is_typing));
        }
    }

    fn room() -> Room {
        Room {
            id: chess_protocol::RoomId::from("r1"),
            room_type: RoomType::Public,
            status: RoomStatus::Active,
            players: vec![
                RoomPlayer { user_id: UserId::from("alice"), color: Color::White },
                RoomPlayer { user_id: UserId::from("bob"), color: Color::Black },
            ],
            invite_code: None,
            created_at_ms: 0,
        }
    }

    async fn service() -> (
        ChatService<ShakmatyOracle, InMemoryHotStore, InMemoryDurableStore, NoopGameEvents, RecordingChatEvents>,
        GameId,
    ) {
        let games = Arc::new(GameManager::new(
            Arc::new(ShakmatyOracle::new()),
            Arc::new(InMemoryHotStore::new()),
            Arc::new(InMemoryDurableStore::new()),
            Arc::new(NoopGameEvents),
            chess_game::GameConfig::default(),
        ));
        let game = games.start(&room(), TimeControl::default()).await.unwrap();
        let svc = ChatService::new(games, Arc::new(RecordingChatEvents::default()), ChatConfig::default());
        (svc, game.id)
    }

    #[tokio::test]
    async fn test_send_under_limit_is_recorded_in_history() {
        let (svc, game_id) = service().await;
        svc.send(&game_id, UserId::from("alice"), "gl hf".into()).await.unwrap();
        let history = svc.history(&game_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_send_too_long_is_rejected() {
        let (svc, game_id) = service().await;
        let text = "a".repeat(501);
        let result = svc.send(&game_id, UserId::from("alice"), text).await;
        assert!(matches!(result, Err(ChatError::TooLong { max: 500 })));
    }

    #[tokio::test]
    async fn test_send_blank_after_trim_is_rejected() {
        let (svc, game_id) = service().await;
        let result = svc.send(&game_id, UserId::from("alice"), "   \t  ".into()).await;
        assert!(matches!(result, Err(ChatError::Empty)));
    }

    #[tokio::test]
    async fn test_send_from_non_participant_is_rejected() {
        let (svc, game_id) = service().await;
        let result = svc.send(&game_id, UserId::from("mallory"), "hi".into()).await;
        assert!(matches!(result, Err(ChatError::Game(_))));
    }

    #[tokio::test]
    async fn test_send_exceeding_rate_limit_is_rejected() {
        let (svc, game_id) = service().await;
        let config = ChatConfig { rate_limit_max_messages: 2, ..ChatConfig::default() };
        let svc = ChatService::new(svc.games.clone(), Arc::new(RecordingChatEvents::default()), config);
        svc.send(&game_id, UserId::from("alice"), "one".into()).await.unwrap();
        svc.send(&game_id, UserId::from("alice"), "two".into()).await.unwrap();
        let result = svc.send(&game_id, UserId::from("alice"), "three".into()).await;
        assert!(matches!(result, Err(ChatError::RateLimited(_))));
    }
}
