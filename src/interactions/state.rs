use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::entities::{companion, user_interaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Dislike,
    Star,
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(InteractionKind::Like),
            "dislike" => Ok(InteractionKind::Dislike),
            "star" => Ok(InteractionKind::Star),
            other => Err(format!("unknown interaction '{other}'")),
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InteractionKind::Like => "like",
            InteractionKind::Dislike => "dislike",
            InteractionKind::Star => "star",
        })
    }
}

/// A viewer's flags against one companion. `liked` and `disliked` are never
/// both set; `starred` is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionState {
    pub liked: bool,
    pub disliked: bool,
    pub starred: bool,
}

impl InteractionState {
    pub fn toggled(self, kind: InteractionKind) -> Self {
        let mut next = self;
        match kind {
            InteractionKind::Like => {
                next.liked = !self.liked;
                if next.liked {
                    next.disliked = false;
                }
            }
            InteractionKind::Dislike => {
                next.disliked = !self.disliked;
                if next.disliked {
                    next.liked = false;
                }
            }
            InteractionKind::Star => next.starred = !self.starred,
        }
        next
    }

    /// Collapses a triple that sets both like and dislike, keeping the like.
    pub fn normalized(self) -> Self {
        if self.liked && self.disliked {
            Self { disliked: false, ..self }
        } else {
            self
        }
    }
}

impl From<&user_interaction::Model> for InteractionState {
    fn from(row: &user_interaction::Model) -> Self {
        Self {
            liked: row.liked,
            disliked: row.disliked,
            starred: row.starred,
        }
    }
}

/// Display counters shown on a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub likes: i64,
    pub dislikes: i64,
    pub stars: i64,
}

impl InteractionCounts {
    pub fn apply(self, delta: CountDelta) -> Self {
        Self {
            likes: self.likes + delta.likes,
            dislikes: self.dislikes + delta.dislikes,
            stars: self.stars + delta.stars,
        }
    }
}

impl From<&companion::Model> for InteractionCounts {
    fn from(model: &companion::Model) -> Self {
        Self {
            likes: model.likes,
            dislikes: model.dislikes,
            stars: model.stars,
        }
    }
}

/// Counter adjustment implied by moving from one state to another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountDelta {
    pub likes: i64,
    pub dislikes: i64,
    pub stars: i64,
}

impl CountDelta {
    pub fn between(before: InteractionState, after: InteractionState) -> Self {
        fn step(before: bool, after: bool) -> i64 {
            i64::from(after) - i64::from(before)
        }
        Self {
            likes: step(before.liked, after.liked),
            dislikes: step(before.disliked, after.disliked),
            stars: step(before.starred, after.starred),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.likes == 0 && self.dislikes == 0 && self.stars == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: InteractionState = InteractionState { liked: false, disliked: false, starred: false };

    #[test]
    fn like_after_dislike_swaps_flags_and_counts() {
        let before = InteractionState { disliked: true, ..NONE };
        let after = before.toggled(InteractionKind::Like);
        assert_eq!(after, InteractionState { liked: true, ..NONE });

        let delta = CountDelta::between(before, after);
        assert_eq!(delta, CountDelta { likes: 1, dislikes: -1, stars: 0 });

        let counts = InteractionCounts { likes: 10, dislikes: 3, stars: 1 }.apply(delta);
        assert_eq!(counts, InteractionCounts { likes: 11, dislikes: 2, stars: 1 });
    }

    #[test]
    fn dislike_is_symmetric() {
        let before = InteractionState { liked: true, starred: true, ..NONE };
        let after = before.toggled(InteractionKind::Dislike);
        assert_eq!(after, InteractionState { disliked: true, starred: true, ..NONE });
    }

    #[test]
    fn second_toggle_clears_the_flag() {
        let liked = NONE.toggled(InteractionKind::Like);
        assert_eq!(liked.toggled(InteractionKind::Like), NONE);
        assert_eq!(CountDelta::between(liked, NONE).likes, -1);
    }

    #[test]
    fn star_never_touches_like_or_dislike() {
        for base in [
            NONE,
            InteractionState { liked: true, ..NONE },
            InteractionState { disliked: true, ..NONE },
        ] {
            let after = base.toggled(InteractionKind::Star);
            assert_eq!(after.liked, base.liked);
            assert_eq!(after.disliked, base.disliked);
            assert_ne!(after.starred, base.starred);
        }
    }

    #[test]
    fn toggles_never_produce_like_and_dislike_together() {
        let kinds = [InteractionKind::Like, InteractionKind::Dislike, InteractionKind::Star];
        let mut state = NONE;
        for round in 0..27 {
            state = state.toggled(kinds[round % 3]).toggled(kinds[(round / 3) % 3]);
            assert!(!(state.liked && state.disliked));
        }
    }

    #[test]
    fn normalized_prefers_like() {
        let both = InteractionState { liked: true, disliked: true, starred: false };
        assert_eq!(both.normalized(), InteractionState { liked: true, ..NONE });
    }
}
