use chrono_tz::Tz;

/// Resolve a contact's timezone, falling back to the configured system
/// default, falling back to UTC.
///
/// An unparseable name is a degraded path, not an error: time
/// restrictions still evaluate, just in the wrong offset, which beats
/// dropping notifications. Both fallbacks log at warn level.
///
/// # Examples
///
/// ```
/// use klaxon_router::timezone::resolve;
///
/// assert_eq!(resolve(Some("Australia/Perth"), "UTC").name(), "Australia/Perth");
/// assert_eq!(resolve(Some("Not/AZone"), "UTC"), chrono_tz::Tz::UTC);
/// assert_eq!(resolve(None, "Also/Bogus"), chrono_tz::Tz::UTC);
/// ```
pub fn resolve(contact_tz: Option<&str>, default_tz: &str) -> Tz {
    if let Some(name) = contact_tz {
        match name.parse::<Tz>() {
            Ok(tz) => return tz,
            Err(_) => {
                tracing::warn!(timezone = name, "invalid contact timezone, using default");
            }
        }
    }
    match default_tz.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone = default_tz, "invalid default timezone, using UTC");
            Tz::UTC
        }
    }
}
