//! Preferences
//!
//! Normalises ranked choice lists into a validated table of preference scores.
//! A participant ranking `C` options scores their first choice `C`, their second
//! `C - 1` and so on down to `1` for their last choice. Blank cells are skipped
//! and do not consume a rank.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use smallvec::SmallVec;
use thiserror::Error;

use crate::ids::{OptionId, ParticipantId};

/// Preference list of a single participant, most preferred first.
pub type PreferenceList = SmallVec<[PreferenceEntry; 5]>;

/// Errors raised while normalising preference input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    /// No participants were supplied.
    #[error("no participants supplied")]
    NoParticipants,

    /// No options were referenced or supplied.
    #[error("no options supplied")]
    NoOptions,

    /// A participant appears more than once in the participant list.
    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(ParticipantId),

    /// A participant has more than one ranking.
    #[error("participant {0} has more than one ranking")]
    DuplicateRanking(ParticipantId),

    /// A ranking refers to a participant missing from the participant list.
    #[error("ranking supplied for unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    /// A participant ranked the same option more than once.
    #[error("participant {participant} ranked option {option} more than once")]
    DuplicateOption {
        /// Participant whose ranking is invalid
        participant: ParticipantId,

        /// Option that was repeated
        option: OptionId,
    },

    /// A participant has no non-blank choices and cannot be assigned.
    #[error("participant {0} has no ranked choices")]
    NoRankedChoices(ParticipantId),

    /// A pre-scored preference named a blank option.
    #[error("participant {0} scored a blank option")]
    BlankOption(ParticipantId),

    /// A pre-scored preference carried a zero score.
    #[error("participant {participant} gave option {option} a zero score")]
    ZeroScore {
        /// Participant whose preference is invalid
        participant: ParticipantId,

        /// Option with the zero score
        option: OptionId,
    },
}

/// Raw ranked choices of one participant, as read from an input row.
///
/// `None` and whitespace-only cells are gaps.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ranking {
    /// Participant the ranking belongs to
    pub participant: ParticipantId,

    /// Choices, most preferred first
    pub choices: Vec<Option<String>>,
}

impl Ranking {
    /// Create a ranking from raw cells.
    pub fn new<I, S>(participant: impl Into<ParticipantId>, choices: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            participant: participant.into(),
            choices: choices.into_iter().map(|c| c.map(Into::into)).collect(),
        }
    }

    /// Create a ranking where every cell is filled in; empty strings are still gaps.
    pub fn of(participant: &str, choices: &[&str]) -> Self {
        Self::new(participant, choices.iter().map(|c| Some(*c)))
    }

    /// Non-blank choices in rank order.
    pub fn ranked_choices(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .filter_map(|cell| cell.as_deref().map(str::trim))
            .filter(|cell| !cell.is_empty())
    }
}

/// One ranked option of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceEntry {
    /// Index of the option in the catalog
    pub option_idx: usize,

    /// 1-based rank of the option in the participant's list
    pub rank: usize,

    /// Preference score, higher is better
    pub score: usize,
}

/// Convert a 1-based rank into a score for a list of `choice_count` choices.
pub fn rank_to_score(rank: usize, choice_count: usize) -> usize {
    (choice_count + 1).saturating_sub(rank)
}

/// Validated preference table.
///
/// Participants keep the order they were supplied in, which is the order the
/// model is built in. The option catalog is sorted by identifier.
#[derive(Debug, Clone)]
pub struct PreferenceIndex {
    participants: Vec<ParticipantId>,
    preferences: Vec<PreferenceList>,
    options: Vec<OptionId>,
}

impl PreferenceIndex {
    /// Build the index from raw rankings.
    ///
    /// `options` lists stand-alone options to include in the catalog even when
    /// nobody ranked them.
    ///
    /// # Errors
    ///
    /// Returns a [`PreferenceError`] if the participants or rankings are invalid.
    pub fn from_rankings(
        participants: &[ParticipantId],
        options: &[OptionId],
        rankings: &[Ranking],
    ) -> Result<Self, PreferenceError> {
        let positions = participant_positions(participants)?;
        let mut raw: Vec<Option<Vec<(OptionId, usize)>>> = vec![None; participants.len()];

        for ranking in rankings {
            let slot = claim_slot(&positions, &mut raw, &ranking.participant)?;

            let choices: Vec<&str> = ranking.ranked_choices().collect();
            let count = choices.len();

            let mut seen = FxHashSet::default();
            let mut scored = Vec::with_capacity(count);

            for (idx, choice) in choices.into_iter().enumerate() {
                if !seen.insert(choice) {
                    return Err(PreferenceError::DuplicateOption {
                        participant: ranking.participant.clone(),
                        option: OptionId::from(choice),
                    });
                }

                scored.push((OptionId::from(choice), rank_to_score(idx + 1, count)));
            }

            *slot = Some(scored);
        }

        Self::assemble(participants, options, raw)
    }

    /// Build the index from preferences that already carry scores.
    ///
    /// Each participant's list is taken to be in rank order.
    ///
    /// # Errors
    ///
    /// Returns a [`PreferenceError`] if the participants or preferences are invalid.
    pub fn from_scored(
        participants: &[ParticipantId],
        options: &[OptionId],
        scored: &[(ParticipantId, Vec<(OptionId, usize)>)],
    ) -> Result<Self, PreferenceError> {
        let positions = participant_positions(participants)?;
        let mut raw: Vec<Option<Vec<(OptionId, usize)>>> = vec![None; participants.len()];

        for (participant, prefs) in scored {
            let slot = claim_slot(&positions, &mut raw, participant)?;

            let mut seen = FxHashSet::default();
            let mut normalised = Vec::with_capacity(prefs.len());

            for (option, score) in prefs {
                let option = option.as_str().trim();

                if option.is_empty() {
                    return Err(PreferenceError::BlankOption(participant.clone()));
                }

                if !seen.insert(option) {
                    return Err(PreferenceError::DuplicateOption {
                        participant: participant.clone(),
                        option: OptionId::from(option),
                    });
                }

                if *score == 0 {
                    return Err(PreferenceError::ZeroScore {
                        participant: participant.clone(),
                        option: OptionId::from(option),
                    });
                }

                normalised.push((OptionId::from(option), *score));
            }

            *slot = Some(normalised);
        }

        Self::assemble(participants, options, raw)
    }

    fn assemble(
        participants: &[ParticipantId],
        options: &[OptionId],
        raw: Vec<Option<Vec<(OptionId, usize)>>>,
    ) -> Result<Self, PreferenceError> {
        let mut catalog: BTreeSet<&OptionId> = options.iter().collect();

        for (participant, prefs) in participants.iter().zip(&raw) {
            match prefs {
                Some(prefs) if !prefs.is_empty() => {
                    catalog.extend(prefs.iter().map(|(option, _)| option));
                }
                _ => return Err(PreferenceError::NoRankedChoices(participant.clone())),
            }
        }

        if catalog.is_empty() {
            return Err(PreferenceError::NoOptions);
        }

        let options: Vec<OptionId> = catalog.into_iter().cloned().collect();

        let option_positions: FxHashMap<&OptionId, usize> = options
            .iter()
            .enumerate()
            .map(|(idx, option)| (option, idx))
            .collect();

        let preferences = raw
            .iter()
            .flatten()
            .map(|prefs| {
                prefs
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, (option, score))| {
                        option_positions
                            .get(option)
                            .map(|&option_idx| PreferenceEntry {
                                option_idx,
                                rank: idx + 1,
                                score: *score,
                            })
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            participants: participants.to_vec(),
            preferences,
            options,
        })
    }

    /// Participants in model order.
    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    /// Option catalog, sorted by identifier.
    pub fn options(&self) -> &[OptionId] {
        &self.options
    }

    /// Look up an option by its catalog index.
    pub fn option(&self, option_idx: usize) -> Option<&OptionId> {
        self.options.get(option_idx)
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the index has no participants. A built index is never empty.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Total number of preference entries across all participants.
    pub fn entry_count(&self) -> usize {
        self.preferences.iter().map(SmallVec::len).sum()
    }

    /// Preferences of the participant at `participant_idx`, most preferred first.
    pub fn preferences_for(&self, participant_idx: usize) -> &[PreferenceEntry] {
        self.preferences
            .get(participant_idx)
            .map_or(&[], SmallVec::as_slice)
    }

    /// Iterate participants with their preferences, in model order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &[PreferenceEntry])> {
        self.participants
            .iter()
            .zip(self.preferences.iter().map(SmallVec::as_slice))
    }

    /// Score a participant gave an option, if they ranked it.
    pub fn score_of(&self, participant: &str, option: &str) -> Option<usize> {
        let participant_idx = self
            .participants
            .iter()
            .position(|p| p.as_str() == participant)?;

        self.preferences_for(participant_idx)
            .iter()
            .find(|entry| self.option(entry.option_idx).is_some_and(|o| o.as_str() == option))
            .map(|entry| entry.score)
    }
}

fn participant_positions(
    participants: &[ParticipantId],
) -> Result<FxHashMap<&ParticipantId, usize>, PreferenceError> {
    if participants.is_empty() {
        return Err(PreferenceError::NoParticipants);
    }

    let mut positions = FxHashMap::default();

    for (idx, participant) in participants.iter().enumerate() {
        if positions.insert(participant, idx).is_some() {
            return Err(PreferenceError::DuplicateParticipant(participant.clone()));
        }
    }

    Ok(positions)
}

fn claim_slot<'r, T>(
    positions: &FxHashMap<&ParticipantId, usize>,
    raw: &'r mut [Option<T>],
    participant: &ParticipantId,
) -> Result<&'r mut Option<T>, PreferenceError> {
    let slot = positions
        .get(participant)
        .and_then(|&idx| raw.get_mut(idx))
        .ok_or_else(|| PreferenceError::UnknownParticipant(participant.clone()))?;

    if slot.is_some() {
        return Err(PreferenceError::DuplicateRanking(participant.clone()));
    }

    Ok(slot)
}
