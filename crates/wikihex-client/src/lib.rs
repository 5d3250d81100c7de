//! wikihex-client - the async side of the wikihex game client
//!
//! The [`session::GameSession`] turns presentation intents into authority
//! calls and reports back through [`wikihex_core::SessionEvent`]s. It is
//! built from a few replaceable parts:
//! - [`authority::RemoteAuthority`]: owner of all game state
//! - [`sync::TurnSynchronizer`]: snapshots, turn state and the action budget
//! - [`resolver::CaptureResolver`]: plays a contest on a selected tile
//! - [`sub_game::SubGame`]: the quiz round a contest is played in
//!
//! [`local::ServerState`] is an in-process authority with AI opponents.

pub mod authority;
pub mod config;
pub mod local;
pub mod resolver;
pub mod room;
pub mod session;
pub mod store;
pub mod sub_game;
pub mod sync;

pub use authority::{AuthorityError, RemoteAuthority};
pub use config::{ClientConfig, ConfigError};
pub use local::{LocalAuthority, ServerState};
pub use resolver::{CaptureResolver, ContestReport};
pub use room::{GameRoom, RoomError, RoomRules, RoomStatus};
pub use session::{GameSession, SessionError, StartMode};
pub use store::JsonFileStore;
pub use sub_game::{
    channel_sub_game, BotSubGame, ChannelSubGame, SubGame, SubGameFrontend, TimedSubGame,
};
pub use sync::{CancelToken, GameView, Sleeper, SyncSettings, TokioSleeper, TurnSynchronizer};
