use anyhow::Result;

/// Timezone identifiers accepted by `--timezone`, optionally filtered by a
/// case-insensitive substring.
pub fn matching_timezones(filter: Option<&str>) -> Vec<&'static str> {
    let needle = filter.map(|f| f.to_lowercase());
    chrono_tz::TZ_VARIANTS
        .iter()
        .map(|tz| tz.name())
        .filter(|name| match &needle {
            Some(n) => name.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .collect()
}

pub fn run_timezones(filter: Option<&str>) -> Result<()> {
    for name in matching_timezones(filter) {
        println!("{name}");
    }
    Ok(())
}
