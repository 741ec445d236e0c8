//! Black-box fuzzing tests for the hstore codec and placeholder rewriting.
//!
//! Random and edge-case inputs must produce errors, never panics.

use pg_dialect::db::Hstore;
use pg_dialect::dialect::rebind::{count_placeholders, rebind_with};
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random text drawn from characters that matter to the parsers.
fn random_sql_like(len: usize) -> String {
    const ALPHABET: &[char] = &[
        'a', 'Z', '1', ' ', '?', '\'', '"', '$', '-', '/', '*', '\\', '\n', 'E', '=', '>', ',',
        'é',
    ];
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}

fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),
        " ".to_string(),
        "\n\r\t".to_string(),
        "\0".to_string(),
        "'".to_string(),
        "\"".to_string(),
        "$".to_string(),
        "$$".to_string(),
        "/*".to_string(),
        "--".to_string(),
        "=>".to_string(),
        "\\".to_string(),
        "E'\\".to_string(),
        "?".repeat(1000),
        "üöÄ".repeat(100),
        "'OR 1=1--".to_string(),
    ]
}

#[test]
fn test_fuzz_binary_decode_never_panics() {
    let mut rng = rand::thread_rng();
    for _ in 0..2000 {
        let len = rng.gen_range(0..64);
        let bytes: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
        let _ = Hstore::from_binary(&bytes);
    }
}

#[test]
fn test_fuzz_binary_huge_lengths_rejected() {
    let mut bytes = 1i32.to_be_bytes().to_vec();
    bytes.extend_from_slice(&i32::MAX.to_be_bytes());
    bytes.extend_from_slice(b"abc");
    assert!(Hstore::from_binary(&bytes).is_err());
}

#[test]
fn test_fuzz_text_parse_never_panics() {
    for s in edge_case_strings() {
        let _ = s.parse::<Hstore>();
    }
    for _ in 0..2000 {
        let len = rand::thread_rng().gen_range(0..48);
        let _ = random_sql_like(len).parse::<Hstore>();
    }
}

#[test]
fn test_fuzz_display_parses_back() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let pairs = rng.gen_range(1..8);
        let mut hstore = Hstore::new();
        for _ in 0..pairs {
            let key = random_sql_like(rng.gen_range(0..12));
            let value = rng.gen_bool(0.8).then(|| random_sql_like(rng.gen_range(0..12)));
            hstore.insert(key, value);
        }

        let text = hstore.to_string();
        let parsed: Hstore = text.parse().unwrap_or_else(|e| panic!("{text:?}: {e}"));
        assert_eq!(parsed, hstore);

        let bytes = hstore.to_binary().unwrap().unwrap();
        assert_eq!(Hstore::from_binary(&bytes).unwrap(), hstore);
    }
}

#[test]
fn test_fuzz_rebind_never_panics() {
    for s in edge_case_strings() {
        let _ = rebind_with(&s, |i| format!("${}", i));
    }
    for _ in 0..2000 {
        let len = rand::thread_rng().gen_range(0..64);
        let sql = random_sql_like(len);
        let _ = rebind_with(&sql, |i| format!("${}", i));
    }
}

#[test]
fn test_fuzz_rebind_plain_text_counts_every_marker() {
    for _ in 0..200 {
        let words: Vec<String> = (0..8).map(|_| random_string(5)).collect();
        let sql = words.join(" = ? AND ");
        assert_eq!(count_placeholders(&sql), words.len() - 1);
        let rebound = rebind_with(&sql, |i| format!("${}", i));
        assert!(!rebound.contains('?'));
        assert!(rebound.contains("$7"));
    }
}
