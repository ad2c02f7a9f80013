//! Heuristics for pairing free-text album/artist names with catalog entries.

use crate::models::CatalogAlbum;

/// Trims, lowercases and folds every run of characters outside `[a-z0-9]`
/// into a single space.
pub fn normalize_for_compare(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut in_gap = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            in_gap = false;
            out.push(c);
        } else if !in_gap {
            in_gap = true;
            out.push(' ');
        }
    }

    out
}

fn is_exact(item: &CatalogAlbum, album: &str, artist: &str) -> bool {
    normalize_for_compare(&item.name) == album && normalize_for_compare(&item.artist_name) == artist
}

fn is_close(item: &CatalogAlbum, album: &str, artist: &str) -> bool {
    let album_text = normalize_for_compare(&item.name);
    let artist_text = normalize_for_compare(&item.artist_name);
    album_text.contains(album) || album.contains(album_text.as_str()) || artist_text.contains(artist)
}

/// Picks the most plausible catalog entry for an album/artist pair.
///
/// Preference order: first exact match on both normalized names, then the
/// first close match, then simply the first item. `None` only when `items`
/// is empty.
pub fn select_best_match<'a>(
    items: &'a [CatalogAlbum],
    expected_album: &str,
    expected_artist: &str,
) -> Option<&'a CatalogAlbum> {
    let album = normalize_for_compare(expected_album);
    let artist = normalize_for_compare(expected_artist);

    items
        .iter()
        .find(|item| is_exact(item, &album, &artist))
        .or_else(|| items.iter().find(|item| is_close(item, &album, &artist)))
        .or_else(|| items.first())
}

/// Whether a catalog album plausibly is the album the model named.
///
/// Stricter than [`select_best_match`]: the album names must contain one
/// another and the artist names must overlap.
pub fn names_match(item: &CatalogAlbum, expected_album: &str, expected_artist: &str) -> bool {
    let album = normalize_for_compare(expected_album);
    let artist = normalize_for_compare(expected_artist);
    let album_text = normalize_for_compare(&item.name);
    let artist_text = normalize_for_compare(&item.artist_name);
    let (album, artist) = (album.trim(), artist.trim());
    let (album_text, artist_text) = (album_text.trim(), artist_text.trim());

    // A name with nothing comparable left would be contained in anything
    if [album, artist, album_text, artist_text].iter().any(|s| s.is_empty()) {
        return false;
    }

    let album_ok = album_text.contains(album) || album.contains(album_text);
    let artist_ok = artist_text.contains(artist) || artist.contains(artist_text);

    album_ok && artist_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(id: &str, name: &str, artist: &str) -> CatalogAlbum {
        CatalogAlbum {
            id: id.to_string(),
            name: name.to_string(),
            artist_name: artist.to_string(),
            artist_id: None,
            image_url: String::new(),
        }
    }

    #[test]
    fn test_normalize_for_compare() {
        assert_eq!(normalize_for_compare("  OK Computer "), "ok computer");
        assert_eq!(normalize_for_compare("AM/PM -- Live!"), "am pm live ");
        assert_eq!(normalize_for_compare("Beyoncé"), "beyonc ");
    }

    #[test]
    fn test_select_prefers_exact_over_earlier_close() {
        let items = vec![
            album("1", "Kid A Mnesia", "Radiohead"),
            album("2", "Kid A", "Radiohead"),
        ];
        let best = select_best_match(&items, "kid a", "RADIOHEAD").unwrap();
        assert_eq!(best.id, "2");
    }

    #[test]
    fn test_select_falls_back_to_close() {
        let items = vec![
            album("1", "Something Else", "Other"),
            album("2", "Blonde (Explicit)", "Frank Ocean"),
        ];
        let best = select_best_match(&items, "Blonde", "Frank Ocean").unwrap();
        assert_eq!(best.id, "2");
    }

    #[test]
    fn test_select_falls_back_to_first() {
        let items = vec![album("1", "Alpha", "A"), album("2", "Beta", "B")];
        let best = select_best_match(&items, "Gamma", "C").unwrap();
        assert_eq!(best.id, "1");
    }

    #[test]
    fn test_select_empty() {
        assert!(select_best_match(&[], "Kid A", "Radiohead").is_none());
    }

    #[test]
    fn test_names_match_tolerates_edition_suffix() {
        let item = album("1", "Rumours (Super Deluxe)", "Fleetwood Mac");
        assert!(names_match(&item, "Rumours", "Fleetwood Mac"));
    }

    #[test]
    fn test_names_match_rejects_wrong_artist() {
        let item = album("1", "Blue", "Weezer");
        assert!(!names_match(&item, "Blue", "Joni Mitchell"));
    }

    #[test]
    fn test_names_match_rejects_artist_without_comparable_text() {
        let item = album("1", "Blue", "Joni Mitchell");
        assert!(!names_match(&item, "Blue", "!!!"));
        assert!(!names_match(&item, "Blue", "  "));
        assert!(!names_match(&album("2", "Blue", "???"), "Blue", "Joni Mitchell"));
    }

    #[test]
    fn test_names_match_rejects_unrelated_album() {
        let item = album("1", "Abbey Road", "The Beatles");
        assert!(!names_match(&item, "Revolver", "The Beatles"));
    }
}
