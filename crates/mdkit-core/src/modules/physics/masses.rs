//! Standard atomic masses (amu), symbol keyed, covering the elements the
//! type table and common MD inputs can produce.

const ATOMIC_MASSES: [(&str, f64); 36] = [
    ("H", 1.008),
    ("He", 4.002602),
    ("Li", 6.94),
    ("Be", 9.0121831),
    ("B", 10.81),
    ("C", 12.011),
    ("N", 14.007),
    ("O", 15.999),
    ("F", 18.998403163),
    ("Ne", 20.1797),
    ("Na", 22.98976928),
    ("Mg", 24.305),
    ("Al", 26.9815385),
    ("Si", 28.085),
    ("P", 30.973761998),
    ("S", 32.06),
    ("Cl", 35.45),
    ("Ar", 39.948),
    ("K", 39.0983),
    ("Ca", 40.078),
    ("Sc", 44.955908),
    ("Ti", 47.867),
    ("V", 50.9415),
    ("Cr", 51.9961),
    ("Mn", 54.938044),
    ("Fe", 55.845),
    ("Co", 58.933194),
    ("Ni", 58.6934),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Ga", 69.723),
    ("Ge", 72.630),
    ("As", 74.921595),
    ("Se", 78.971),
    ("Br", 79.904),
    ("Kr", 83.798),
];

pub(super) fn atomic_mass(symbol: &str) -> Option<f64> {
    let normalized = symbol.trim();
    if normalized.is_empty() {
        return None;
    }

    // The placeholder symbol stands in for unmapped numeric type codes.
    if normalized == "X" {
        return Some(1.0);
    }

    ATOMIC_MASSES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(normalized))
        .map(|(_, mass)| *mass)
}

#[cfg(test)]
mod tests {
    use super::atomic_mass;

    #[test]
    fn known_symbols_resolve_case_insensitively() {
        assert_eq!(atomic_mass("Ar"), Some(39.948));
        assert_eq!(atomic_mass("ar"), Some(39.948));
        assert_eq!(atomic_mass(" Cu "), Some(63.546));
    }

    #[test]
    fn placeholder_symbol_has_unit_mass() {
        assert_eq!(atomic_mass("X"), Some(1.0));
    }

    #[test]
    fn unknown_symbols_are_none() {
        assert_eq!(atomic_mass(""), None);
        assert_eq!(atomic_mass("Qq"), None);
    }
}
