//! Game service: move validation, the draw protocol, resignation, and
//! per-second clock ticking, one actor per active game.

mod actor;
mod config;
mod error;
mod events;
mod manager;

pub use actor::{GameHandle, TickOutcome};
pub use config::GameConfig;
pub use error::GameError;
pub use events::GameEvents;
pub use manager::GameManager;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chess_protocol::{Color, GameId, Room, RoomPlayer, RoomStatus, RoomType, TimeControl, UserId};
    use chess_rules::ShakmatyOracle;
    use chess_store::{DurableStore, InMemoryDurableStore, InMemoryHotStore};
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingEvents {
        game_overs: Mutex<Vec<chess_protocol::Game>>,
    }

    impl GameEvents for RecordingEvents {
        async fn on_state_changed(&self, _game: chess_protocol::Game) {}
        async fn on_invalid_move(
            &self,
            _game_id: chess_protocol::GameId,
            _user_id: UserId,
            _reason: String,
            _attempt_count: u32,
        ) {
        }
        async fn on_draw_offered(&self, _game_id: chess_protocol::GameId, _from_user_id: UserId) {}
        async fn on_draw_declined(&self, _game_id: chess_protocol::GameId, _by_user_id: UserId) {}
        async fn on_chat_message(&self, _game_id: chess_protocol::GameId, _entry: chess_protocol::ChatEntry) {}
        async fn on_game_over(&self, game: chess_protocol::Game, _room_id: chess_protocol::RoomId) {
            self.game_overs.lock().await.push(game);
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

    fn manager() -> GameManager<ShakmatyOracle, InMemoryHotStore, InMemoryDurableStore, RecordingEvents> {
        GameManager::new(
            Arc::new(ShakmatyOracle::new()),
            Arc::new(InMemoryHotStore::new()),
            Arc::new(InMemoryDurableStore::new()),
            Arc::new(RecordingEvents::default()),
            GameConfig::default(),
        )
    }

    fn manager_with_durable() -> (
        GameManager<ShakmatyOracle, InMemoryHotStore, InMemoryDurableStore, RecordingEvents>,
        Arc<InMemoryDurableStore>,
    ) {
        let durable = Arc::new(InMemoryDurableStore::new());
        let mgr = GameManager::new(
            Arc::new(ShakmatyOracle::new()),
            Arc::new(InMemoryHotStore::new()),
            Arc::clone(&durable),
            Arc::new(RecordingEvents::default()),
            GameConfig::default(),
        );
        (mgr, durable)
    }

    #[tokio::test]
    async fn test_start_creates_active_game_with_shared_room_id() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        assert_eq!(game.id.as_str(), "r1");
        assert_eq!(game.status, chess_protocol::GameStatus::Active);
    }

    #[tokio::test]
    async fn test_make_move_by_white_then_black_advances_position() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        mgr.make_move(&game.id, UserId::from("alice"), "e2".into(), "e4".into(), None)
            .await
            .unwrap();
        let after = mgr
            .make_move(&game.id, UserId::from("bob"), "e7".into(), "e5".into(), None)
            .await
            .unwrap();
        assert_eq!(after.move_history.len(), 2);
    }

    #[tokio::test]
    async fn test_make_move_out_of_turn_is_rejected() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        let result = mgr
            .make_move(&game.id, UserId::from("bob"), "e7".into(), "e5".into(), None)
            .await;
        assert!(matches!(result, Err(GameError::NotYourTurn(_))));
    }

    #[tokio::test]
    async fn test_three_illegal_moves_bans_the_player() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        for _ in 0..2 {
            let result = mgr
                .make_move(&game.id, UserId::from("alice"), "e2".into(), "e5".into(), None)
                .await;
            assert!(matches!(result, Err(GameError::IllegalMove(_))));
        }
        let result = mgr
            .make_move(&game.id, UserId::from("alice"), "e2".into(), "e5".into(), None)
            .await;
        assert!(matches!(result, Err(GameError::TooManyInvalidMoves(_))));
    }

    #[tokio::test]
    async fn test_resign_ends_game_with_opponent_as_winner() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        let after = mgr.resign(&game.id, UserId::from("alice")).await.unwrap();
        assert_eq!(after.status, chess_protocol::GameStatus::Resigned);
        assert_eq!(after.winner_user_id, Some(UserId::from("bob")));
    }

    #[tokio::test]
    async fn test_resign_closes_room_in_the_same_durable_transaction() {
        let (mgr, durable) = manager_with_durable();
        durable.upsert_room(room()).await.unwrap();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();

        mgr.resign(&game.id, UserId::from("alice")).await.unwrap();

        let stored_game = durable.get_game(&game.id).await.unwrap().unwrap();
        let stored_room = durable.get_room(&room().id).await.unwrap().unwrap();
        assert_eq!(stored_game.status, chess_protocol::GameStatus::Resigned);
        assert_eq!(stored_room.status, RoomStatus::Closed);
    }

    #[tokio::test]
    async fn test_draw_offer_requires_acceptance_from_other_player() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        mgr.offer_draw(&game.id, UserId::from("alice")).await.unwrap();
        let after = mgr.respond_draw(&game.id, UserId::from("bob"), true).await.unwrap();
        assert_eq!(after.status, chess_protocol::GameStatus::Draw);
    }

    #[tokio::test]
    async fn test_respond_draw_without_offer_is_rejected() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        let result = mgr.respond_draw(&game.id, UserId::from("bob"), true).await;
        assert!(matches!(result, Err(GameError::NoDrawOffer(_))));
    }

    #[tokio::test]
    async fn test_tick_to_zero_times_out_the_side_to_move() {
        let mgr = GameManager::new(
            Arc::new(ShakmatyOracle::new()),
            Arc::new(InMemoryHotStore::new()),
            Arc::new(InMemoryDurableStore::new()),
            Arc::new(RecordingEvents::default()),
            GameConfig::default(),
        );
        let game = mgr
            .start(
                &room(),
                TimeControl { initial_secs: 1, increment_secs: 0 },
            )
            .await
            .unwrap();
        let outcome = mgr.tick(&game.id).await.unwrap();
        match outcome {
            TickOutcome::TimedOut(g) => {
                assert_eq!(g.status, chess_protocol::GameStatus::Completed);
                assert_eq!(g.winner_user_id, Some(UserId::from("bob")));
            }
            TickOutcome::Continued => panic!("expected timeout"),
        }
    }

    #[tokio::test]
    async fn test_load_returns_snapshot_from_live_actor() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        let loaded = mgr.load(&game.id, &UserId::from("alice")).await.unwrap();
        assert_eq!(loaded.id, game.id);
    }

    #[tokio::test]
    async fn test_load_from_non_participant_is_rejected() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        let result = mgr.load(&game.id, &UserId::from("mallory")).await;
        assert!(matches!(result, Err(GameError::NotParticipant(_, _))));
    }

    #[tokio::test]
    async fn test_load_with_blank_game_id_is_invalid() {
        let mgr = manager();
        let result = mgr.load(&GameId::from("  "), &UserId::from("alice")).await;
        assert!(matches!(result, Err(GameError::InvalidId(_))));
    }

    #[tokio::test]
    async fn test_append_chat_from_non_participant_is_rejected() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        let entry = chess_protocol::ChatEntry {
            author_user_id: UserId::from("mallory"),
            text: "hi".into(),
            timestamp_ms: 0,
        };
        let result = mgr.append_chat(&game.id, entry).await;
        assert!(matches!(result, Err(GameError::NotParticipant(_, _))));
    }

    #[tokio::test]
    async fn test_abandon_ends_game_with_opponent_as_winner_and_purges_hot_store() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        let after = mgr.abandon(&game.id, UserId::from("alice")).await.unwrap();
        assert_eq!(after.status, chess_protocol::GameStatus::Abandoned);
        assert_eq!(after.winner_user_id, Some(UserId::from("bob")));
    }

    #[tokio::test]
    async fn test_append_chat_from_participant_is_recorded() {
        let mgr = manager();
        let game = mgr.start(&room(), TimeControl::default()).await.unwrap();
        let entry = chess_protocol::ChatEntry {
            author_user_id: UserId::from("alice"),
            text: "gl hf".into(),
            timestamp_ms: 0,
        };
        mgr.append_chat(&game.id, entry).await.unwrap();
        let loaded = mgr.load(&game.id, &UserId::from("alice")).await.unwrap();
        assert_eq!(loaded.chat.len(), 1);
    }
}
