//! Game rooms of the in-process authority.
//!
//! A room holds one game: its two players, the tile matrix, whose move it is
//! and the contest currently being played. All rules that change a tile live
//! here; the session only ever sees the snapshots a room produces.

use crate::config::ClientConfig;
use rand::prelude::*;
use rand::seq::index;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use wikihex_core::bot::chronological_answer;
use wikihex_core::hex::are_neighbors;
use wikihex_core::tile::OFFERED_CATEGORIES;
use wikihex_core::{
    compute_scores, Board, BoardError, Bot, BotDifficulty, Category, CategoryId, ContestId,
    ContestIntent, ContestResult, ContestTask, Difficulty, GameId, GameSnapshot, GridDims,
    HexCoord, Player, PlayerId, RawTiles, SubGameKind, TileId, TileState,
};

/// Name the AI opponent plays under
pub const BOT_NAME: &str = "AI Bot";

const CATEGORY_TITLES: [&str; 11] = [
    "Nature",
    "Culture",
    "Geography",
    "Space",
    "Natural Sciences",
    "Food",
    "History",
    "Celebrities",
    "Entertainment",
    "Politics",
    "Sports",
];

/// Years quiz events are drawn from
const FIRST_YEAR: usize = 1000;
const YEAR_SPAN: usize = 1025;
const ANSWER_OPTIONS: usize = 4;

/// Smallest board that fits both spawns with a ring of neighbours each
pub const MIN_BOARD_SIZE: usize = 4;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Game is over")]
    GameFinished,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("No contests left this turn")]
    TurnSpent,

    #[error("Tile {0} is not a legal move")]
    IllegalMove(TileId),

    #[error("Category {category} is not offered on tile {tile}")]
    CategoryNotOffered { tile: TileId, category: CategoryId },

    #[error("Contest {0} is not open")]
    UnknownContest(ContestId),

    #[error("Board size {0} is below the minimum of {}", MIN_BOARD_SIZE)]
    BoardTooSmall(usize),

    #[error("Invalid board: {0}")]
    Board(#[from] BoardError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

/// The rules a room plays by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomRules {
    pub board_size: usize,
    /// Turns each player gets before the game is scored
    pub max_turns: u32,
    pub contests_per_turn: u8,
    pub bot_difficulty: BotDifficulty,
}

impl Default for RoomRules {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for RoomRules {
    fn from(config: &ClientConfig) -> Self {
        Self {
            board_size: config.board_size,
            max_turns: config.max_turns,
            contests_per_turn: wikihex_core::TOTAL_ACTION_POINTS,
            bot_difficulty: config.bot_difficulty,
        }
    }
}

/// A contest that has been started and not yet answered
#[derive(Debug, Clone)]
struct OpenContest {
    id: ContestId,
    player: PlayerId,
    tile: TileId,
    category: CategoryId,
    intent: ContestIntent,
    correct_answers: Vec<String>,
}

/// A game between two players, one of which may be a bot
pub struct GameRoom {
    pub id: GameId,
    pub status: RoomStatus,
    /// Host first; the host owns the top-left spawn and moves first
    players: Vec<Player>,
    bot: Option<Bot>,
    rules: RoomRules,
    categories: Vec<Category>,
    tiles: RawTiles,
    next_move: Option<PlayerId>,
    contests_this_turn: u8,
    turns_played: HashMap<PlayerId, u32>,
    winners: Option<Vec<PlayerId>>,
    contest: Option<OpenContest>,
    rng: StdRng,
}

impl GameRoom {
    pub fn new(id: GameId, host: Player, rules: RoomRules) -> Self {
        Self::with_rng(id, host, rules, StdRng::from_entropy())
    }

    /// A room whose board and quizzes are reproducible
    pub fn with_seed(id: GameId, host: Player, rules: RoomRules, seed: u64) -> Self {
        Self::with_rng(id, host, rules, StdRng::seed_from_u64(seed))
    }

    fn with_rng(id: GameId, host: Player, rules: RoomRules, rng: StdRng) -> Self {
        let categories = CATEGORY_TITLES
            .iter()
            .map(|title| Category::new(CategoryId::new_v4(), *title))
            .collect();
        Self {
            id,
            status: RoomStatus::Waiting,
            players: vec![host],
            bot: None,
            rules,
            categories,
            tiles: Vec::new(),
            next_move: None,
            contests_this_turn: 0,
            turns_played: HashMap::new(),
            winners: None,
            contest: None,
            rng,
        }
    }

    pub fn host(&self) -> PlayerId {
        self.players[0].id
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= 2
    }

    pub fn next_move(&self) -> Option<PlayerId> {
        self.next_move
    }

    pub fn bot_id(&self) -> Option<PlayerId> {
        self.bot.as_ref().map(|bot| bot.player_id)
    }

    /// Seat a second player; the game starts right away
    pub fn add_player(&mut self, player: Player) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        if self.rules.board_size < MIN_BOARD_SIZE {
            return Err(RoomError::BoardTooSmall(self.rules.board_size));
        }

        self.players.push(player);
        self.start_game()
    }

    /// Seat an AI opponent
    pub fn add_bot(&mut self) -> Result<PlayerId, RoomError> {
        let id = PlayerId::new_v4();
        let seed = self.rng.gen();
        self.add_player(Player::new(id, BOT_NAME))?;
        self.bot = Some(Bot::with_seed(id, self.rules.bot_difficulty, seed));
        Ok(id)
    }

    fn start_game(&mut self) -> Result<(), RoomError> {
        self.tiles = self.generate_board();
        // Fail here rather than in every later snapshot
        Board::rebuild(&self.tiles)?;
        self.next_move = Some(self.host());
        self.status = RoomStatus::InGame;
        debug!("Room {} started", self.id);
        Ok(())
    }

    /// A square board with about half of its cells present. Each player
    /// owns a spawn tile whose neighbours are always present.
    fn generate_board(&mut self) -> RawTiles {
        let size = self.rules.board_size;
        let dims = GridDims::new(size, size);
        let spawns: Vec<usize> = [HexCoord::new(1, 1), HexCoord::new(size - 2, size - 2)]
            .into_iter()
            .filter_map(|coord| dims.index_of(coord))
            .collect();

        let mut present = vec![false; dims.cell_count()];
        for index in 0..dims.cell_count() {
            if spawns
                .iter()
                .any(|&spawn| spawn == index || are_neighbors(spawn, index, dims))
            {
                present[index] = true;
            }
        }

        let mut rest: Vec<usize> = (0..dims.cell_count()).filter(|&i| !present[i]).collect();
        rest.shuffle(&mut self.rng);
        let wanted = dims.cell_count() / 2;
        let missing = wanted.saturating_sub(present.iter().filter(|&&p| p).count());
        for index in rest.into_iter().take(missing) {
            present[index] = true;
        }

        let owners: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        let mut tiles = Vec::with_capacity(size);
        for row in 0..size {
            let mut cells = Vec::with_capacity(size);
            for column in 0..size {
                let index = row * size + column;
                let cell = present[index].then(|| {
                    let owner = spawns
                        .iter()
                        .position(|&spawn| spawn == index)
                        .and_then(|seat| owners.get(seat).copied());
                    self.generate_tile(owner)
                });
                cells.push(cell);
            }
            tiles.push(cells);
        }
        tiles
    }

    fn generate_tile(&mut self, owner: Option<PlayerId>) -> TileState {
        let difficulty = match owner {
            Some(_) => Difficulty::default(),
            None => Difficulty::new(self.rng.gen_range(0..=Difficulty::MAX.level()))
                .unwrap_or_default(),
        };
        let available_categories = index::sample(&mut self.rng, self.categories.len(), OFFERED_CATEGORIES)
            .into_iter()
            .map(|i| self.categories[i].clone())
            .collect();
        TileState {
            id: TileId::new_v4(),
            difficulty,
            owner_id: owner,
            chosen_category_id: None,
            available_categories,
        }
    }

    /// The game as `viewer` sees it
    pub fn snapshot_for(&self, viewer: PlayerId) -> Result<GameSnapshot, RoomError> {
        let me = self
            .players
            .iter()
            .find(|p| p.id == viewer)
            .cloned()
            .ok_or(RoomError::PlayerNotInRoom)?;
        let opponent = self.players.iter().find(|p| p.id != viewer).cloned();

        Ok(GameSnapshot {
            id: self.id,
            me,
            opponent,
            tiles: self.tiles.clone(),
            next_move_player_id: self.next_move,
            awaiting_opponent_to_join: self.status == RoomStatus::Waiting,
            winning_player_ids: self.winners.clone(),
            turns_played: self.turns_played.get(&viewer).copied().unwrap_or(0),
        })
    }

    fn check_mover(&self, player: PlayerId) -> Result<(), RoomError> {
        if !self.has_player(player) {
            return Err(RoomError::PlayerNotInRoom);
        }
        match self.status {
            RoomStatus::Waiting => return Err(RoomError::GameNotStarted),
            RoomStatus::Finished => return Err(RoomError::GameFinished),
            RoomStatus::InGame => {}
        }
        if self.next_move != Some(player) {
            return Err(RoomError::NotYourTurn);
        }
        Ok(())
    }

    /// Open a contest on `tile`. A contest that was never answered is
    /// replaced.
    pub fn start_contest(
        &mut self,
        player: PlayerId,
        tile: TileId,
        category: CategoryId,
    ) -> Result<ContestTask, RoomError> {
        self.check_mover(player)?;
        if self.contests_this_turn >= self.rules.contests_per_turn {
            return Err(RoomError::TurnSpent);
        }

        let board = Board::rebuild(&self.tiles)?;
        if !board.legal_moves(player).contains(tile) {
            return Err(RoomError::IllegalMove(tile));
        }
        let target = board.tile(tile).ok_or(RoomError::IllegalMove(tile))?;
        let offered = match target.chosen_category_id {
            Some(chosen) => chosen == category,
            None => target.available_categories.iter().any(|c| c.id == category),
        };
        let title = target
            .available_categories
            .iter()
            .find(|c| c.id == category)
            .filter(|_| offered)
            .map(|c| c.title.clone())
            .ok_or(RoomError::CategoryNotOffered { tile, category })?;
        let intent = ContestIntent::for_ownership(target.ownership(player));

        let task = self.generate_quiz(&title);
        self.contest = Some(OpenContest {
            id: task.id,
            player,
            tile,
            category,
            intent,
            correct_answers: chronological_answer(&task),
        });
        Ok(task)
    }

    fn generate_quiz(&mut self, title: &str) -> ContestTask {
        let kind = SubGameKind::ALL[self.rng.gen_range(0..SubGameKind::ALL.len())];
        let answer_options: Vec<String> = index::sample(&mut self.rng, YEAR_SPAN, ANSWER_OPTIONS)
            .into_iter()
            .map(|offset| (FIRST_YEAR + offset).to_string())
            .collect();
        let description = match kind {
            SubGameKind::Sequencing => format!("Put these {} events in chronological order", title),
            SubGameKind::ImageGuess => format!("When was the {} picture taken?", title),
            SubGameKind::MultipleChoice => format!("Which {} event came first?", title),
        };
        let image_ref = (kind == SubGameKind::ImageGuess)
            .then(|| format!("{}/{}", title.to_lowercase().replace(' ', "-"), answer_options[0]));

        ContestTask {
            id: ContestId::new_v4(),
            kind,
            description,
            answer_options,
            image_ref,
        }
    }

    /// Grade an answer, apply the contest if it passed and spend one of the
    /// turn's contests
    pub fn submit_answer(
        &mut self,
        player: PlayerId,
        contest: ContestId,
        answers: &[String],
    ) -> Result<ContestResult, RoomError> {
        self.check_mover(player)?;
        let open = match self.contest.take() {
            Some(open) if open.id == contest && open.player == player => open,
            other => {
                self.contest = other;
                return Err(RoomError::UnknownContest(contest));
            }
        };

        let result = ContestResult {
            correct_answers: open.correct_answers.clone(),
        };
        if result.passed(answers) {
            self.apply_success(&open);
        }

        self.contests_this_turn += 1;
        if self.contests_this_turn >= self.rules.contests_per_turn {
            self.end_turn();
        }
        Ok(result)
    }

    fn apply_success(&mut self, contest: &OpenContest) {
        let Some(tile) = self
            .tiles
            .iter_mut()
            .flat_map(|row| row.iter_mut())
            .filter_map(Option::as_mut)
            .find(|tile| tile.id == contest.tile)
        else {
            return;
        };

        match contest.intent {
            ContestIntent::Capture | ContestIntent::Attack => tile.owner_id = Some(contest.player),
            ContestIntent::LevelUp => tile.difficulty = tile.difficulty.raised(),
        }
        tile.chosen_category_id.get_or_insert(contest.category);
        debug!("{:?} on {} succeeded", contest.intent, contest.tile);
    }

    /// Hand the move over, or score the game once every player has had
    /// their turns or the next player has nothing left to play
    fn end_turn(&mut self) {
        let Some(current) = self.next_move else {
            return;
        };
        *self.turns_played.entry(current).or_default() += 1;
        self.contests_this_turn = 0;
        self.contest = None;

        let next = self
            .players
            .iter()
            .map(|p| p.id)
            .find(|&id| id != current)
            .unwrap_or(current);
        self.next_move = Some(next);

        let all_played = self
            .players
            .iter()
            .all(|p| self.turns_played.get(&p.id).copied().unwrap_or(0) >= self.rules.max_turns);
        let stuck = Board::rebuild(&self.tiles)
            .map(|board| board.legal_moves(next).is_empty())
            .unwrap_or(true);
        if all_played || stuck {
            self.finish();
        }
    }

    /// Score the board; a tie makes both players winners
    fn finish(&mut self) {
        let host = self.host();
        let guest = self.players.get(1).map(|p| p.id);
        let scores = match Board::rebuild(&self.tiles) {
            Ok(board) => compute_scores(&board, host, guest),
            Err(_) => return,
        };

        let winners = match (scores.mine.cmp(&scores.opponent), guest) {
            (std::cmp::Ordering::Greater, _) | (_, None) => vec![host],
            (std::cmp::Ordering::Less, Some(guest)) => vec![guest],
            (std::cmp::Ordering::Equal, Some(guest)) => vec![host, guest],
        };
        debug!(
            "Room {} finished {}:{}, winners {:?}",
            self.id, scores.mine, scores.opponent, winners
        );
        self.winners = Some(winners);
        self.status = RoomStatus::Finished;
    }

    /// Let the bot play every contest of its turn. Returns how many it played.
    pub fn play_bot_turns(&mut self) -> Result<usize, RoomError> {
        let Some(bot_id) = self.bot_id() else {
            return Ok(0);
        };

        let mut played = 0;
        while self.status == RoomStatus::InGame && self.next_move == Some(bot_id) {
            let board = Board::rebuild(&self.tiles)?;
            let Some(bot) = self.bot.as_mut() else {
                break;
            };
            let Some(tile) = bot.choose_tile(&board).and_then(|id| board.tile(id)) else {
                debug!("Bot has no legal move, passing");
                self.end_turn();
                continue;
            };
            let category = match tile.chosen_category_id {
                Some(chosen) => Some(chosen),
                None => bot.choose_category(&tile.available_categories),
            };
            let Some(category) = category else {
                self.end_turn();
                continue;
            };
            let (tile_id, difficulty) = (tile.id, tile.difficulty);

            let task = self.start_contest(bot_id, tile_id, category)?;
            let answers = match self.bot.as_mut() {
                Some(bot) => bot.answer(&task, difficulty),
                None => Vec::new(),
            };
            self.submit_answer(bot_id, task.id, &answers)?;
            played += 1;
        }
        Ok(played)
    }
}
