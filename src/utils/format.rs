use crate::model::Address;

/// `abcd…wxyz` form of an address for log lines.
pub fn short_address(address: &Address) -> String {
	let full = address.to_string();
	if full.len() <= 12 {
		return full;
	}
	format!("{}…{}", &full[..4], &full[full.len() - 4..])
}

/// Human-readable duration for interval log lines, e.g. `1m30s` or `250ms`.
pub fn format_interval(interval: std::time::Duration) -> String {
	let millis = interval.as_millis();
	if millis < 1000 {
		return format!("{}ms", millis);
	}
	let secs = interval.as_secs();
	match (secs / 60, secs % 60) {
		(0, s) => format!("{}s", s),
		(m, 0) => format!("{}m", m),
		(m, s) => format!("{}m{}s", m, s),
	}
}
