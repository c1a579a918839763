//! Human-readable slugs and opaque short codes for visitor URLs.

use rand::Rng;
use sqlx::SqlitePool;

use crate::error::ServiceResult;

const SHORT_CODE_LEN: usize = 8;
pub const MAX_SLUG_LEN: usize = 80;
// Room left for a `-N` counter when querying for siblings of a long slug.
const COUNTER_ROOM: usize = 10;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Lowercase ASCII slug: accents folded, runs of other characters collapsed to `-`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(fold_char) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if out.len() > MAX_SLUG_LEN {
        out.truncate(MAX_SLUG_LEN);
        while out.ends_with('-') {
            out.pop();
        }
    }
    if out.is_empty() {
        "item".into()
    } else {
        out
    }
}

fn fold_char(c: char) -> Vec<char> {
    let folded: &str = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'Ç' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ñ' | 'Ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'œ' | 'Œ' => "oe",
        'ß' => "ss",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        '&' => " and ",
        _ => return vec![c],
    };
    folded.chars().collect()
}

/// First of `base`, `base-1`, `base-2`, ... for which `taken` returns false.
/// `base` is shortened as needed so the counter stays within `MAX_SLUG_LEN`.
pub fn unique_slug<F>(base: &str, mut taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let suffix = format!("-{n}");
        let candidate = format!("{}{suffix}", head(base, MAX_SLUG_LEN - suffix.len()));
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn head(base: &str, max: usize) -> &str {
    let end = base
        .char_indices()
        .nth(max)
        .map(|(i, _)| i)
        .unwrap_or(base.len());
    base[..end].trim_end_matches('-')
}

/// LIKE pattern matching `base` and every counter variant `unique_slug` can produce from it.
fn siblings_pattern(base: &str) -> String {
    format!("{}%", head(base, MAX_SLUG_LEN - COUNTER_ROOM))
}

/// Unique tour slug, ignoring the tour identified by `except_id` (itself, on update).
pub async fn unique_tour_slug(
    pool: &SqlitePool,
    base: &str,
    except_id: Option<&str>,
) -> ServiceResult<String> {
    let prefix_like = siblings_pattern(base);
    let existing: Vec<String> = sqlx::query_scalar(
        "SELECT slug FROM tours WHERE (slug = ?1 OR slug LIKE ?2) AND id != COALESCE(?3, '')",
    )
    .bind(base)
    .bind(&prefix_like)
    .bind(except_id)
    .fetch_all(pool)
    .await?;

    Ok(unique_slug(base, |s| existing.iter().any(|e| e == s)))
}

/// Unique stop slug within one tour.
pub async fn unique_stop_slug(
    pool: &SqlitePool,
    tour_id: &str,
    base: &str,
    except_id: Option<&str>,
) -> ServiceResult<String> {
    let prefix_like = siblings_pattern(base);
    let existing: Vec<String> = sqlx::query_scalar(
        "SELECT slug FROM stops
         WHERE tour_id = ?1 AND (slug = ?2 OR slug LIKE ?3) AND id != COALESCE(?4, '')",
    )
    .bind(tour_id)
    .bind(base)
    .bind(&prefix_like)
    .bind(except_id)
    .fetch_all(pool)
    .await?;

    Ok(unique_slug(base, |s| existing.iter().any(|e| e == s)))
}

/// Random 8-character base36 token.
pub fn random_short_code() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_CODE_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// A short code not used by any stop yet.
pub async fn unused_short_code(pool: &SqlitePool) -> ServiceResult<String> {
    loop {
        let code = random_short_code();
        let taken: Option<String> =
            sqlx::query_scalar("SELECT id FROM stops WHERE short_code = ?1")
                .bind(&code)
                .fetch_optional(pool)
                .await?;
        if taken.is_none() {
            return Ok(code);
        }
        tracing::debug!("short code collision on {code}, retrying");
    }
}

pub fn short_url(public_base_url: &str, short_code: &str) -> String {
    format!("{}/s/{}", public_base_url.trim_end_matches('/'), short_code)
}

pub fn visitor_url(public_base_url: &str, tour_slug: &str, stop_slug: &str) -> String {
    format!(
        "{}/visitor/tour/{}/stop/{}",
        public_base_url.trim_end_matches('/'),
        tour_slug,
        stop_slug
    )
}

/// Accept only what `slugify` could have produced (used for user-supplied slugs).
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_SLUG_LEN
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
}

pub fn is_valid_short_code(s: &str) -> bool {
    s.len() == SHORT_CODE_LEN && s.bytes().all(|b| BASE36.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_folds_and_collapses() {
        assert_eq!(slugify("The Mona Lisa"), "the-mona-lisa");
        assert_eq!(slugify("  Café  Déjà-vu!! "), "cafe-deja-vu");
        assert_eq!(slugify("Rock & Roll"), "rock-and-roll");
        assert_eq!(slugify("Straße 42"), "strasse-42");
        assert_eq!(slugify("???"), "item");
        assert_eq!(slugify("日本"), "item");
    }

    #[test]
    fn slugify_output_is_valid() {
        for input in ["Hall of Mirrors", "--x--", "Œuvre n°5", "a    b"] {
            assert!(is_valid_slug(&slugify(input)), "{input}");
        }
    }

    #[test]
    fn unique_slug_appends_counter() {
        let mut existing: Vec<String> = Vec::new();
        for _ in 0..3 {
            let slug = unique_slug("gallery", |s| existing.iter().any(|e| e == s));
            existing.push(slug);
        }
        assert_eq!(existing, vec!["gallery", "gallery-1", "gallery-2"]);
    }

    #[test]
    fn long_slugs_stay_valid_with_a_counter() {
        let base = slugify(&"a".repeat(100));
        assert_eq!(base.len(), MAX_SLUG_LEN);

        let mut existing = vec![base.clone()];
        for _ in 0..11 {
            let slug = unique_slug(&base, |s| existing.iter().any(|e| e == s));
            assert!(is_valid_slug(&slug), "{slug}");
            existing.push(slug);
        }
        assert_eq!(existing[1], format!("{}-1", "a".repeat(78)));
        assert_eq!(existing[11], format!("{}-11", "a".repeat(77)));
    }

    #[test]
    fn truncated_head_drops_trailing_dash() {
        let base = format!("{}-bb", "a".repeat(77));
        assert_eq!(base.len(), MAX_SLUG_LEN);
        let slug = unique_slug(&base, |s| s == base);
        assert_eq!(slug, format!("{}-1", "a".repeat(77)));
        assert!(is_valid_slug(&slug));
    }

    #[test]
    fn short_codes_are_base36() {
        let code = random_short_code();
        assert_eq!(code.len(), 8);
        assert!(is_valid_short_code(&code));
        assert!(!is_valid_short_code("ABC12345"));
        assert!(!is_valid_short_code("abc1234"));
    }

    #[test]
    fn urls_are_built_from_base() {
        assert_eq!(short_url("https://m.org/", "abc12345"), "https://m.org/s/abc12345");
        assert_eq!(
            visitor_url("https://m.org", "east-wing", "vase"),
            "https://m.org/visitor/tour/east-wing/stop/vase"
        );
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("east-wing-2"));
        assert!(!is_valid_slug("East"));
        assert!(!is_valid_slug("-a"));
        assert!(!is_valid_slug("a--b"));
        assert!(!is_valid_slug(""));
    }
}
