//! Preference profiles derived from engagement history
//!
//! A profile is the raw per-user genre counters; a summary is its ranked
//! view. Both are pure data (no I/O), so ranking and prompt rendering are
//! trivially testable.

use serde::{Deserialize, Serialize};

/// One genre's accumulated like count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub likes: u64,
}

/// Per-user genre like-counters, in first-liked order
///
/// Entry order is the order genres were first liked. The ranking breaks
/// ties with it, so it is carried through serialization rather than
/// recovered from a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    #[serde(rename = "liked_genres", default)]
    counts: Vec<GenreCount>,
}

impl PreferenceProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one like for `genre`, creating the counter on first touch
    ///
    /// Returns the new count. Counters only increase; likes are not
    /// retracted.
    pub fn record_like(&mut self, genre: &str) -> u64 {
        if let Some(entry) = self.counts.iter_mut().find(|c| c.genre == genre) {
            entry.likes += 1;
            entry.likes
        } else {
            self.counts.push(GenreCount {
                genre: genre.to_string(),
                likes: 1,
            });
            1
        }
    }

    /// Like count for `genre`; zero when never liked
    pub fn likes_for(&self, genre: &str) -> u64 {
        self.counts
            .iter()
            .find(|c| c.genre == genre)
            .map(|c| c.likes)
            .unwrap_or(0)
    }

    /// Counters in first-liked order
    pub fn entries(&self) -> &[GenreCount] {
        &self.counts
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }
}

/// Ranked view of a profile
///
/// Genres sorted by like count descending; equal counts keep first-liked
/// order (a stable sort over the profile's insertion order).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceSummary {
    entries: Vec<GenreCount>,
}

impl PreferenceSummary {
    /// Derive the ranking from a profile snapshot
    pub fn from_profile(profile: &PreferenceProfile) -> Self {
        let mut entries = profile.entries().to_vec();
        // sort_by is stable, so ties keep first-liked order
        entries.sort_by(|a, b| b.likes.cmp(&a.likes));
        Self { entries }
    }

    /// Genres in rank order, most liked first
    pub fn entries(&self) -> &[GenreCount] {
        &self.entries
    }

    /// The most liked genre, if any
    pub fn top(&self) -> Option<&GenreCount> {
        self.entries.first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the preference block of a scoring prompt
    ///
    /// One line per genre in rank order. An empty profile renders a neutral
    /// placeholder so scoring still sees a well-formed prompt.
    pub fn prompt_context(&self) -> String {
        if self.entries.is_empty() {
            return "No strong preferences.".to_string();
        }

        self.entries
            .iter()
            .map(|e| format!("- {} ({} likes)", e.genre, e.likes))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_like_counts() {
        let mut profile = PreferenceProfile::new();
        assert_eq!(profile.record_like("jazz"), 1);
        assert_eq!(profile.record_like("jazz"), 2);
        assert_eq!(profile.record_like("rock"), 1);

        assert_eq!(profile.likes_for("jazz"), 2);
        assert_eq!(profile.likes_for("rock"), 1);
        assert_eq!(profile.likes_for("classical"), 0);
        assert_eq!(profile.len(), 2);
    }

    #[test]
    fn test_ranking_orders_by_count_descending() {
        let mut profile = PreferenceProfile::new();
        profile.record_like("rock");
        profile.record_like("jazz");
        profile.record_like("jazz");

        let summary = PreferenceSummary::from_profile(&profile);
        let genres: Vec<&str> = summary.entries().iter().map(|e| e.genre.as_str()).collect();
        assert_eq!(genres, vec!["jazz", "rock"]);
        assert_eq!(summary.top().unwrap().likes, 2);
    }

    #[test]
    fn test_ranking_ties_keep_first_liked_order() {
        let mut profile = PreferenceProfile::new();
        profile.record_like("classical");
        profile.record_like("hip-hop");
        profile.record_like("jazz");
        profile.record_like("jazz");

        let summary = PreferenceSummary::from_profile(&profile);
        let genres: Vec<&str> = summary.entries().iter().map(|e| e.genre.as_str()).collect();
        // jazz leads on count; the 1-like tie resolves in first-liked order
        assert_eq!(genres, vec!["jazz", "classical", "hip-hop"]);
    }

    #[test]
    fn test_empty_profile_is_valid() {
        let profile = PreferenceProfile::new();
        let summary = PreferenceSummary::from_profile(&profile);
        assert!(summary.is_empty());
        assert!(summary.top().is_none());
        assert_eq!(summary.prompt_context(), "No strong preferences.");
    }

    #[test]
    fn test_prompt_context_format() {
        let mut profile = PreferenceProfile::new();
        profile.record_like("rock");
        profile.record_like("rock");
        profile.record_like("jazz");

        let summary = PreferenceSummary::from_profile(&profile);
        assert_eq!(
            summary.prompt_context(),
            "- rock (2 likes)\n- jazz (1 likes)"
        );
    }

    #[test]
    fn test_profile_serde_preserves_order() {
        let mut profile = PreferenceProfile::new();
        profile.record_like("hip-hop");
        profile.record_like("rock");

        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("liked_genres"));

        let restored: PreferenceProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, profile);
        assert_eq!(restored.entries()[0].genre, "hip-hop");
    }
}
