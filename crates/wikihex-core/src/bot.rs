//! AI players for wikihex.
//!
//! Bots come in three difficulty levels:
//! - Easy: random legal tile, often wrong answers
//! - Medium: prefers captures and attacks over level-ups
//! - Hard: picks the tile with the best expected score swing
//!
//! Bots answer the chronology quizzes the in-process authority hands out:
//! every answer option is a year, sequencing wants them oldest first and the
//! single-answer kinds want the oldest one.

use crate::board::Board;
use crate::contest::{ContestTask, SubGameKind};
use crate::ids::{CategoryId, PlayerId, TileId};
use crate::tile::{Category, Difficulty, Ownership, Tile};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
    Hard,
}

impl BotDifficulty {
    /// Chance of answering a level-0 question right
    fn base_accuracy(&self) -> f64 {
        match self {
            BotDifficulty::Easy => 0.5,
            BotDifficulty::Medium => 0.7,
            BotDifficulty::Hard => 0.9,
        }
    }

    /// Chance of answering a question on a tile of `difficulty` right
    pub fn accuracy(&self, difficulty: Difficulty) -> f64 {
        (self.base_accuracy() - 0.1 * f64::from(difficulty.level())).max(0.1)
    }
}

/// A bot player that can decide on moves and answers
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose a tile among the bot's legal moves
    pub fn choose_tile(&mut self, board: &Board) -> Option<TileId> {
        let legal = board.legal_moves(self.player_id);
        let candidates: Vec<&Tile> = legal.iter().filter_map(|id| board.tile(id)).collect();
        if candidates.is_empty() {
            return None;
        }

        match self.difficulty {
            BotDifficulty::Easy => candidates.choose(&mut self.rng).map(|t| t.id),
            BotDifficulty::Medium => self.choose_medium(&candidates),
            BotDifficulty::Hard => self.choose_hard(&candidates),
        }
    }

    /// Medium: expand first, then fight, level up only when nothing else is left
    fn choose_medium(&mut self, candidates: &[&Tile]) -> Option<TileId> {
        for wanted in [Ownership::Unowned, Ownership::Opponent] {
            let matching: Vec<_> = candidates
                .iter()
                .filter(|t| t.ownership(self.player_id) == wanted)
                .collect();
            if !matching.is_empty() {
                return matching.choose(&mut self.rng).map(|t| t.id);
            }
        }

        // Only own tiles left; skip the ones already at max level if possible
        let upgradable: Vec<_> = candidates
            .iter()
            .filter(|t| t.difficulty < Difficulty::MAX)
            .collect();
        if !upgradable.is_empty() {
            return upgradable.choose(&mut self.rng).map(|t| t.id);
        }
        candidates.choose(&mut self.rng).map(|t| t.id)
    }

    /// Hard: maximise expected score swing
    fn choose_hard(&mut self, candidates: &[&Tile]) -> Option<TileId> {
        let mut scored: Vec<_> = candidates
            .iter()
            .map(|tile| (tile.id, self.expected_swing(tile)))
            .collect();

        // Shuffle first so ties do not always go to the top-left tile
        scored.shuffle(&mut self.rng);
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.first().map(|(id, _)| *id)
    }

    /// Score difference gained by winning the contest on `tile`, weighted by
    /// the chance of winning it
    fn expected_swing(&self, tile: &Tile) -> f64 {
        let points = tile.difficulty.points() as f64;
        let swing = match tile.ownership(self.player_id) {
            Ownership::Unowned => points,
            // Taking a tile removes it from the opponent as well
            Ownership::Opponent => 2.0 * points,
            Ownership::Mine if tile.difficulty < Difficulty::MAX => 1.0,
            Ownership::Mine => 0.0,
        };
        swing * self.difficulty.accuracy(tile.difficulty)
    }

    /// Pick a category for a tile that has none yet
    pub fn choose_category(&mut self, offered: &[Category]) -> Option<CategoryId> {
        offered.choose(&mut self.rng).map(|c| c.id)
    }

    /// Answer a quiz question on a tile of `difficulty`
    pub fn answer(&mut self, task: &ContestTask, difficulty: Difficulty) -> Vec<String> {
        if self.rng.gen_bool(self.difficulty.accuracy(difficulty)) {
            return chronological_answer(task);
        }

        let mut options = task.answer_options.clone();
        options.shuffle(&mut self.rng);
        if !task.kind.is_ordering() {
            options.truncate(1);
        }
        options
    }
}

/// The right answer to a chronology question.
///
/// Options that are not years sort after the ones that are.
pub fn chronological_answer(task: &ContestTask) -> Vec<String> {
    let mut ordered = task.answer_options.clone();
    ordered.sort_by_key(|option| option.trim().parse::<i64>().unwrap_or(i64::MAX));
    match task.kind {
        SubGameKind::Sequencing => ordered,
        SubGameKind::ImageGuess | SubGameKind::MultipleChoice => {
            ordered.into_iter().take(1).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::*;
    use crate::ids::ContestId;

    fn task(kind: SubGameKind, options: &[&str]) -> ContestTask {
        ContestTask {
            id: ContestId::new_v4(),
            kind,
            description: "Oldest first".into(),
            answer_options: options.iter().map(|s| s.to_string()).collect(),
            image_ref: None,
        }
    }

    #[test]
    fn test_bot_creation() {
        let id = PlayerId::new_v4();
        let bot = Bot::new(id, BotDifficulty::Easy);
        assert_eq!(bot.player_id, id);
        assert_eq!(bot.difficulty, BotDifficulty::Easy);
    }

    #[test]
    fn test_bot_only_picks_legal_tiles() {
        let me = PlayerId::new_v4();
        let mut raw = filled(5, 5);
        raw[2][2] = Some(state(Some(me), 0));
        let board = Board::rebuild(&raw).unwrap();
        let legal = board.legal_moves(me);

        for difficulty in [BotDifficulty::Easy, BotDifficulty::Medium, BotDifficulty::Hard] {
            let mut bot = Bot::with_seed(me, difficulty, 7);
            for _ in 0..20 {
                let tile = bot.choose_tile(&board).unwrap();
                assert!(legal.contains(tile));
            }
        }
    }

    #[test]
    fn test_bot_without_territory_has_no_move() {
        let board = Board::rebuild(&filled(3, 3)).unwrap();
        let mut bot = Bot::with_seed(PlayerId::new_v4(), BotDifficulty::Hard, 1);
        assert_eq!(bot.choose_tile(&board), None);
    }

    #[test]
    fn test_medium_bot_prefers_capture() {
        let me = PlayerId::new_v4();
        let them = PlayerId::new_v4();
        let mut raw = filled(1, 3);
        raw[0][0] = Some(state(Some(them), 0));
        raw[0][1] = Some(state(Some(me), 0));
        let board = Board::rebuild(&raw).unwrap();
        let free = board.get(2).unwrap().id;

        let mut bot = Bot::with_seed(me, BotDifficulty::Medium, 3);
        assert_eq!(bot.choose_tile(&board), Some(free));
    }

    #[test]
    fn test_hard_bot_prefers_valuable_attack() {
        let me = PlayerId::new_v4();
        let them = PlayerId::new_v4();
        let mut raw = filled(1, 3);
        raw[0][0] = Some(state(Some(them), 1));
        raw[0][1] = Some(state(Some(me), 0));
        let board = Board::rebuild(&raw).unwrap();
        let target = board.get(0).unwrap().id;

        // Attack: 2 * 2 points * 0.8 beats capture: 1 point * 0.9
        let mut bot = Bot::with_seed(me, BotDifficulty::Hard, 3);
        assert_eq!(bot.choose_tile(&board), Some(target));
    }

    #[test]
    fn test_chronological_answer() {
        let seq = task(SubGameKind::Sequencing, &["1969", "1066", "1789"]);
        assert_eq!(chronological_answer(&seq), vec!["1066", "1789", "1969"]);

        let choice = task(SubGameKind::MultipleChoice, &["1969", "1066", "1789"]);
        assert_eq!(chronological_answer(&choice), vec!["1066"]);
    }

    #[test]
    fn test_answer_shape_matches_kind() {
        let mut bot = Bot::with_seed(PlayerId::new_v4(), BotDifficulty::Easy, 11);
        let choice = task(SubGameKind::ImageGuess, &["1", "2", "3", "4"]);
        let seq = task(SubGameKind::Sequencing, &["1", "2", "3", "4"]);
        for _ in 0..20 {
            assert_eq!(bot.answer(&choice, Difficulty::MAX).len(), 1);
            assert_eq!(bot.answer(&seq, Difficulty::MAX).len(), 4);
        }
    }

    #[test]
    fn test_accuracy_drops_with_difficulty() {
        let hard = BotDifficulty::Hard;
        assert!(hard.accuracy(Difficulty::MAX) < hard.accuracy(Difficulty::default()));
        assert!(BotDifficulty::Easy.accuracy(Difficulty::MAX) > 0.0);
    }
}
