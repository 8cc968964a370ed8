//! Canonical policy names
//!
//! Field names map to policy names by splitting on separators and before
//! every uppercase letter, then joining the capitalised words:
//! `email_address`, `emailAddress` and `email-address` all become
//! `EmailAddress`. An acronym reads as a run of one-letter words, so
//! `userID` and `user_i_d` share the key `UserID`.

/// Derive the canonical policy name for a field
#[must_use]
pub fn canonical_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for word in split_words(field) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars.flat_map(char::to_lowercase));
        }
    }
    out
}

fn split_words(field: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in field.char_indices() {
        if !c.is_alphanumeric() {
            if let Some(s) = start.take() {
                words.push(&field[s..i]);
            }
            continue;
        }

        match start {
            Some(s) if c.is_uppercase() => {
                words.push(&field[s..i]);
                start = Some(i);
            }
            None => start = Some(i),
            Some(_) => {}
        }
    }

    if let Some(s) = start {
        words.push(&field[s..]);
    }
    words
}
