//! The in-game calendar backing `age`, `season` and `month` requirements.
//!
//! A year has 21 months: four five-month seasons followed by the one-month
//! `glow`. Ages are years counted from 10, so month 1 of the game is the
//! first `quiet` month of age 10. Season references may carry an offset,
//! either a month number (`pollen-2`) or one of `start`, `mid` and `end`
//! (the first, third and last month of the season).

/// Months in one in-game year.
pub const MONTHS_PER_YEAR: i32 = 21;

/// Months in one regular season.
pub const MONTHS_PER_SEASON: i32 = 5;

/// Age at the first month of the game.
pub const STARTING_AGE: i32 = 10;

/// Seasons in year order with their lengths in months.
pub const SEASONS: [(&'static str, i32); 5] = [
    ("quiet", 5),
    ("pollen", 5),
    ("dust", 5),
    ("wet", 5),
    ("glow", 1),
];

/// Return true if the name is a season id.
pub fn is_season(name: &str) -> bool {
    SEASONS.iter().any(|(id, _)| *id == name)
}

/// First month-of-year (1 based) of the given season, if it exists.
pub fn season_start(name: &str) -> Option<i32> {
    let mut start = 1;

    for (id, length) in SEASONS.iter() {
        if *id == name {
            return Some(start);
        }
        start += length;
    }

    None
}

/// Month-of-year (1 based) for a season reference like `pollen-2`,
/// `dust-mid` or plain `wet` (its first month).
pub fn month_of_year(reference: &str) -> Option<i32> {
    let mut parts = reference.splitn(2, '-');

    let season = parts.next()?;
    let start = season_start(season)?;
    let length = SEASONS.iter().find(|(id, _)| *id == season)?.1;

    let offset = match parts.next() {
        None | Some("start") => 0,
        Some("mid") => (length - 1) / 2,
        Some("end") => length - 1,
        Some(number) => number.parse::<i32>().ok()?.checked_sub(1)?,
    };

    if offset < 0 || offset >= length {
        return None;
    }

    Some(start + offset)
}

/// Month-of-game for a full reference like `15-pollen-mid` or `12-wet-2`.
pub fn month_of_game(reference: &str) -> Option<i32> {
    let mut parts = reference.splitn(2, '-');

    let age = parts.next()?.parse::<i32>().ok()?;
    let within_year = month_of_year(parts.next()?)?;

    if age < STARTING_AGE {
        return None;
    }

    Some((age - STARTING_AGE) * MONTHS_PER_YEAR + within_year)
}

/// Age during the given month-of-game.
pub fn age_at(month: i32) -> i32 {
    STARTING_AGE + (month.max(1) - 1) / MONTHS_PER_YEAR
}

/// Month-of-year (1 based) during the given month-of-game.
pub fn month_of_year_at(month: i32) -> i32 {
    (month.max(1) - 1) % MONTHS_PER_YEAR + 1
}

/// Season id during the given month-of-game.
pub fn season_at(month: i32) -> &'static str {
    let mut within_year = month_of_year_at(month);

    for (id, length) in SEASONS.iter() {
        if within_year <= *length {
            return id;
        }
        within_year -= length;
    }

    // unreachable by arithmetic, but stay total
    SEASONS[SEASONS.len() - 1].0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_start_where_the_previous_ends() {
        assert_eq!(season_start("quiet"), Some(1));
        assert_eq!(season_start("pollen"), Some(6));
        assert_eq!(season_start("dust"), Some(11));
        assert_eq!(season_start("wet"), Some(16));
        assert_eq!(season_start("glow"), Some(21));
        assert_eq!(season_start("monsoon"), None);
    }

    #[test]
    fn month_of_year_resolves_offsets() {
        assert_eq!(month_of_year("pollen"), Some(6));
        assert_eq!(month_of_year("pollen-start"), Some(6));
        assert_eq!(month_of_year("pollen-mid"), Some(8));
        assert_eq!(month_of_year("pollen-end"), Some(10));
        assert_eq!(month_of_year("pollen-2"), Some(7));
        assert_eq!(month_of_year("glow-end"), Some(21));
        assert_eq!(month_of_year("pollen-6"), None);
    }

    #[test]
    fn month_of_game_counts_whole_years() {
        assert_eq!(month_of_game("10-quiet"), Some(1));
        assert_eq!(month_of_game("15-pollen-mid"), Some(5 * 21 + 8));
        assert_eq!(month_of_game("11-glow"), Some(21 + 21));
        assert_eq!(month_of_game("9-quiet"), None);
        assert_eq!(month_of_game("watermelons"), None);
    }

    #[test]
    fn age_and_season_derive_from_the_month() {
        assert_eq!(age_at(1), 10);
        assert_eq!(age_at(21), 10);
        assert_eq!(age_at(22), 11);
        assert_eq!(season_at(1), "quiet");
        assert_eq!(season_at(8), "pollen");
        assert_eq!(season_at(21), "glow");
        assert_eq!(season_at(22), "quiet");
    }
}
