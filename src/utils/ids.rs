use rand::Rng;

pub const TICKET_PREFIX: &str = "TKT-";
pub const BADGE_PREFIX: &str = "BDG-";

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `TKT-` followed by 8 uppercase base36 characters.
pub fn ticket_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..8)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{TICKET_PREFIX}{suffix}")
}

/// `BDG-` followed by 6 digits.
pub fn badge_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{BADGE_PREFIX}{:06}", rng.gen_range(0..1_000_000u32))
}

pub fn is_ticket_id(id: &str) -> bool {
    id.strip_prefix(TICKET_PREFIX).is_some_and(|rest| {
        rest.len() == 8
            && rest
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
    })
}

pub fn is_badge_id(id: &str) -> bool {
    id.strip_prefix(BADGE_PREFIX)
        .is_some_and(|rest| rest.len() == 6 && rest.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_ids_match_their_formats() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(is_ticket_id(&ticket_id(&mut rng)));
            assert!(is_badge_id(&badge_id(&mut rng)));
        }
    }

    #[test]
    fn test_format_checks() {
        assert!(is_ticket_id("TKT-0A1B2C3D"));
        assert!(!is_ticket_id("TKT-0a1b2c3d"));
        assert!(!is_ticket_id("TKT-0A1B2C3"));
        assert!(is_badge_id("BDG-000001"));
        assert!(!is_badge_id("BDG-00001A"));
    }
}
