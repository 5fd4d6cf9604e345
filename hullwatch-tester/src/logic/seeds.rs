use anyhow::{Context, Result, bail};

/// Largest span a single `start..end` token may expand to.
const MAX_RANGE_LEN: u64 = 10_000;

/// Resolve CLI seed tokens into concrete seeds.
///
/// Accepts literal integers (negative values fold to their magnitude) and
/// half-open ranges such as `100..120`. Duplicates are dropped while keeping
/// first-seen order.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if let Some((start, end)) = token.split_once("..") {
            let start = parse_seed(start).with_context(|| format!("invalid range '{token}'"))?;
            let end = parse_seed(end).with_context(|| format!("invalid range '{token}'"))?;
            if end <= start {
                bail!("seed range '{token}' is empty");
            }
            if end - start > MAX_RANGE_LEN {
                bail!("seed range '{token}' exceeds {MAX_RANGE_LEN} seeds");
            }
            for seed in start..end {
                push_unique(&mut seeds, seed);
            }
            continue;
        }

        push_unique(&mut seeds, parse_seed(token)?);
    }

    if seeds.is_empty() {
        bail!("no seeds provided");
    }
    Ok(seeds)
}

fn parse_seed(token: &str) -> Result<u64> {
    let token = token.trim();
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    token
        .parse::<u64>()
        .with_context(|| format!("unrecognized seed '{token}'"))
}

fn push_unique(seeds: &mut Vec<u64>, seed: u64) {
    if !seeds.contains(&seed) {
        seeds.push(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn numeric_and_range_tokens_expand_in_order() {
        let seeds = resolve_seed_inputs(&tokens(&["7", "3..6", "4", "-9"])).unwrap();
        assert_eq!(seeds, vec![7, 3, 4, 5, 9]);
    }

    #[test]
    fn large_unsigned_seeds_parse() {
        let seeds = resolve_seed_inputs(&tokens(&["18446744073709551615"])).unwrap();
        assert_eq!(seeds, vec![u64::MAX]);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = resolve_seed_inputs(&tokens(&["ORANGE"])).unwrap_err();
        assert!(err.to_string().contains("unrecognized seed"));
        assert!(resolve_seed_inputs(&tokens(&["5..5"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["", " "])).is_err());
    }
}
