use sha2::{Digest, Sha256};

/// Number of rollout buckets; bucket values fall in `0..BUCKETS`.
pub const BUCKETS: u32 = 100;

/// Maps a (flag, user) pair to a stable bucket in `0..100`.
///
/// The digest input is `"{flag_name}:{user_id}"`, so the same user lands in
/// independent buckets for different flags. The first four bytes of the
/// SHA-256 digest are read as a big-endian `u32` and reduced modulo 100.
pub fn bucket(flag_name: &str, user_id: &str) -> u8 {
    let mut hasher = Sha256::new();
    hasher.update(flag_name.as_bytes());
    hasher.update(b":");
    hasher.update(user_id.as_bytes());
    let digest = hasher.finalize();

    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (prefix % BUCKETS) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_buckets() {
        // sha256("new-ui:alice") starts with 0x19836eac
        assert_eq!(bucket("new-ui", "alice"), 48);
        assert_eq!(bucket("new-ui", "bob"), 99);
        assert_eq!(bucket("checkout", "alice"), 52);
        assert_eq!(bucket("beta", "user-42"), 34);
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..10 {
            assert_eq!(bucket("new-ui", "alice"), bucket("new-ui", "alice"));
        }
    }

    #[test]
    fn test_flag_name_changes_bucket() {
        assert_ne!(bucket("new-ui", "alice"), bucket("checkout", "alice"));
    }

    #[test]
    fn test_range() {
        for i in 0..1_000 {
            assert!(bucket("range", &format!("user-{i}")) < 100);
        }
    }

    #[test]
    fn test_roughly_uniform() {
        let samples = 100_000;
        let mut counts = [0u32; 100];
        for i in 0..samples {
            counts[bucket("uniformity", &format!("user-{i}")) as usize] += 1;
        }

        // expected 1000 per bucket; the bounds sit far outside normal noise
        for (value, count) in counts.iter().enumerate() {
            assert!(
                (700..1300).contains(count),
                "bucket {value} got {count} of {samples}"
            );
        }

        let first_half: u32 = counts[..50].iter().sum();
        assert!((48_000..52_000).contains(&first_half));
    }
}
