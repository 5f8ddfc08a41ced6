//! Level engine
//!
//! Maps accumulated experience points onto a level in `[1, MAX_LEVEL]` and
//! reports progress toward the next level.
//!
//! ## Cost curve
//!
//! Advancing from level `L` to `L + 1` costs
//!
//! ```text
//! DeltaCost(L) = ceil((15 + 5L + 0.6L²) / 5) * 5
//! ```
//!
//! which is evaluated in integers as `ceil((75 + 25L + 3L²) / 25) * 5`, so the
//! whole goal table is built at compile time with no float rounding.
//!
//! ```text
//! level:    1    2    3    4  ...
//! goal xp:  0   25   55   95  ...
//! ```
//!
//! Every function here is total: NaN, infinities and negative XP are read as
//! zero.

use serde::Serialize;

/// Highest reachable level
pub const MAX_LEVEL: u32 = 50;

/// XP needed to advance from `level` to `level + 1`
///
/// Zero outside `[1, MAX_LEVEL - 1]`.
pub const fn delta_cost(level: u32) -> u64 {
    if level == 0 || level >= MAX_LEVEL {
        return 0;
    }
    let l = level as u64;
    let scaled = 75 + 25 * l + 3 * l * l;
    scaled.div_ceil(25) * 5
}

const fn build_goal_table() -> [u64; MAX_LEVEL as usize] {
    let mut table = [0u64; MAX_LEVEL as usize];
    let mut i = 1;
    while i < MAX_LEVEL as usize {
        table[i] = table[i - 1] + delta_cost(i as u32);
        i += 1;
    }
    table
}

/// `GOAL_XP[L - 1]` is the cumulative XP at which level `L` starts
const GOAL_XP: [u64; MAX_LEVEL as usize] = build_goal_table();

/// Cumulative XP at which `level` starts (level clamped to `[1, MAX_LEVEL]`)
pub fn goal_xp(level: u32) -> u64 {
    let level = level.clamp(1, MAX_LEVEL);
    GOAL_XP[(level - 1) as usize]
}

fn sanitize(xp: f64) -> f64 {
    if xp.is_finite() && xp > 0.0 {
        xp
    } else {
        0.0
    }
}

/// Level reached with `xp` experience points
pub fn level_from_xp(xp: f64) -> u32 {
    let xp = sanitize(xp);
    // GOAL_XP[0] == 0, so at least one entry always qualifies
    let reached = GOAL_XP.partition_point(|&goal| goal as f64 <= xp);
    (reached as u32).clamp(1, MAX_LEVEL)
}

/// Distance to the next level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpToNext {
    pub to_next: u64,
    pub next_level_goal: u64,
}

/// XP still owed before the next level starts
///
/// At `MAX_LEVEL` nothing is owed and the goal stays at `goal_xp(MAX_LEVEL)`.
pub fn xp_to_next(xp: f64) -> XpToNext {
    let xp = sanitize(xp);
    let level = level_from_xp(xp);

    if level == MAX_LEVEL {
        return XpToNext {
            to_next: 0,
            next_level_goal: goal_xp(MAX_LEVEL),
        };
    }

    let next_level_goal = goal_xp(level + 1);
    let to_next = (next_level_goal as f64 - xp).max(0.0).ceil() as u64;

    XpToNext {
        to_next,
        next_level_goal,
    }
}

/// Percent of the current level already covered, 0..=100
pub fn progress_percent(xp: f64) -> u8 {
    let level = level_from_xp(xp);
    if level == MAX_LEVEL {
        return 100;
    }

    let next = xp_to_next(xp);
    let span = next.next_level_goal.saturating_sub(goal_xp(level)).max(1);
    let covered = span.saturating_sub(next.to_next);

    ((100.0 * covered as f64) / span as f64).round() as u8
}

/// Everything a profile view needs about one XP value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub xp: u64,
    pub level: u32,
    pub current_level_goal: u64,
    pub next_level_goal: u64,
    pub to_next: u64,
    pub percent: u8,
    pub is_max_level: bool,
}

impl LevelProgress {
    pub fn from_xp(xp: f64) -> Self {
        let xp = sanitize(xp);
        let level = level_from_xp(xp);
        let next = xp_to_next(xp);

        Self {
            xp: xp.floor() as u64,
            level,
            current_level_goal: goal_xp(level),
            next_level_goal: next.next_level_goal,
            to_next: next.to_next,
            percent: progress_percent(xp),
            is_max_level: level == MAX_LEVEL,
        }
    }
}
