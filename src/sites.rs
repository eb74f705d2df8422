use anyhow::Result;

use crate::config::Config;
use crate::extract;

pub fn list_sites(config: &Config) -> Result<()> {
    println!("{:<20} {:<10} MARKER", "SITE", "TARGETS");

    for rule in extract::registered_sites() {
        let targets = config
            .targets
            .urls
            .iter()
            .filter(|u| extract::site_id_for_url(u).as_deref() == Some(rule.site))
            .count();
        println!("{:<20} {:<10} {}", rule.site, targets, rule.marker);
    }

    // Configured targets no rule can handle
    for url in &config.targets.urls {
        let site = extract::site_id_for_url(url).unwrap_or_default();
        if extract::find_rule(&site).is_none() {
            println!("warning: no extraction rule for {} ({})", url, site);
        }
    }

    Ok(())
}
