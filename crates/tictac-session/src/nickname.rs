//! Nickname collision resolution.

use tictac_protocol::wire::MAX_STRING_LEN;

/// Picks the nickname a new session will actually get.
///
/// Returns `requested` unchanged if it is free. Otherwise appends `" [N]"`
/// with the smallest `N >= 1` that yields a free name. Comparison is
/// case-sensitive: `"Alice"` and `"alice"` are different players.
///
/// Returns `None` when the requested name is taken and every suffixed
/// form is too long to send back over the wire.
///
/// `is_taken` is consulted while the caller holds the registry lock, so
/// the answer stays valid until the name is inserted.
pub fn resolve<F>(requested: &str, is_taken: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    if requested.len() > MAX_STRING_LEN {
        return None;
    }
    if !is_taken(requested) {
        return Some(requested.to_owned());
    }
    (1u64..)
        .map(|n| format!("{requested} [{n}]"))
        .take_while(|candidate| candidate.len() <= MAX_STRING_LEN)
        .find(|candidate| !is_taken(candidate))
}
