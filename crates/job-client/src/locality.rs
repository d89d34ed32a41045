/// Exact hostname match only; there is no fallback to a non-local replica.
pub fn host_of(addr: &str) -> &str {
    addr.split(':').next().unwrap_or(addr)
}

pub fn find_colocated_daemon<'a>(dn_addr: &str, daemons: &'a [String]) -> Option<&'a str> {
    let target = host_of(dn_addr);
    daemons
        .iter()
        .find(|d| host_of(d) == target)
        .map(|s| s.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_same_host_different_port() {
        let daemons = vec!["10.0.0.1:7100".to_string(), "10.0.0.2:7100".to_string()];
        assert_eq!(
            find_colocated_daemon("10.0.0.2:6000", &daemons),
            Some("10.0.0.2:7100")
        );
    }

    #[test]
    fn no_match_returns_none() {
        let daemons = vec!["10.0.0.1:7100".to_string()];
        assert_eq!(find_colocated_daemon("10.0.0.9:6000", &daemons), None);
    }
}
