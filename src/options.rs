//! Answer option generation
//!
//! Turns clip identifiers into display names and builds the shuffled
//! set of candidate names presented to the player for a round.

use std::collections::HashSet;

use itertools::Itertools;

use crate::{
    catalog::Catalog,
    constants::{catalog::AUDIO_EXTENSIONS, options::MIN_OPTION_COUNT},
};

/// Strips known audio extensions, ignoring case
///
/// Extensions are removed repeatedly together with trailing separators, so
/// `a.ogg.ogg` and `a_.ogg` both end up as `a`.
fn strip_extensions(identifier: &str) -> &str {
    let mut stem = identifier;
    loop {
        stem = stem.trim_end_matches(|c: char| c == '_' || c.is_whitespace());
        match stem.rsplit_once('.') {
            Some((rest, extension))
                if AUDIO_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(extension)) =>
            {
                stem = rest;
            }
            _ => return stem,
        }
    }
}

/// Upper-cases the first character of `word` and keeps the rest as is
///
/// When the upper case form of that character is longer than one
/// character (`ß` becomes `SS`), only its first character stays upper case,
/// so capitalizing again changes nothing.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut upper = first.to_uppercase();
    let mut capitalized = String::with_capacity(word.len());
    capitalized.extend(upper.next());
    capitalized.extend(upper.flat_map(char::to_lowercase));
    capitalized.push_str(chars.as_str());
    capitalized
}

/// Formats a clip identifier into the name shown to the player
///
/// The extension is stripped, underscores become spaces and every word
/// starts with a capital letter, so `false_knight_roar.ogg` becomes
/// `False Knight Roar`. Punctuation and the rest of each word are kept
/// (`king's_idol.ogg` is `King's Idol`). Formatting an already formatted
/// name returns it unchanged.
pub fn format_name(identifier: &str) -> String {
    strip_extensions(identifier.trim())
        .replace('_', " ")
        .split_whitespace()
        .map(capitalize)
        .join(" ")
}

/// Clamps a requested option count to what a catalog can provide
///
/// The result is at least [`MIN_OPTION_COUNT`] unless the catalog has
/// fewer distinct names, in which case every name is used.
pub fn effective_option_count(catalog: &Catalog, requested: usize) -> usize {
    requested
        .max(MIN_OPTION_COUNT)
        .min(catalog.distinct_names())
}

/// Builds the shuffled list of options for a round
///
/// The correct clip's display name is always included. The remaining
/// names are drawn uniformly with replacement from the catalog until
/// `count` unique names are collected, then the whole list is shuffled.
///
/// # Arguments
///
/// * `catalog` - The loaded clip catalog
/// * `correct_clip` - Identifier of the clip being played this round
/// * `count` - Requested number of options (clamped, see [`effective_option_count`])
/// * `rng` - Random source used for draws and the final shuffle
pub fn generate_options(
    catalog: &Catalog,
    correct_clip: &str,
    count: usize,
    rng: &mut fastrand::Rng,
) -> Vec<String> {
    let count = effective_option_count(catalog, count);
    let correct_name = format_name(correct_clip);

    let mut seen = HashSet::from([correct_name.clone()]);
    let mut options = vec![correct_name];

    while options.len() < count {
        let name = catalog.display_names()[rng.usize(..catalog.len())].as_str();
        if seen.insert(name.to_owned()) {
            options.push(name.to_owned());
        }
    }

    rng.shuffle(&mut options);
    options
}

/// Filters options for the searchable list
///
/// Keeps the options containing `query`, ignoring case. An empty query
/// keeps everything. Order is preserved.
pub fn filter_options<'a>(options: &'a [String], query: &str) -> Vec<&'a str> {
    let query = query.trim().to_lowercase();
    options
        .iter()
        .map(String::as_str)
        .filter(|option| option.to_lowercase().contains(&query))
        .collect()
}
