use chrono::TimeZone;
use tracing::debug;

use std::{fmt::Display, io::Write};

use crate::{
    anilist::CurrentSeason,
    console::Console,
    types::{DisplayRecord, EpisodeNumber},
};

/// e.g. `Tue (14/11) at 10:13 PM`
const AIRING_TIME_FORMAT: &str = "%a (%d/%m) at %I:%M %p";

pub fn to_display_records(season: CurrentSeason) -> Vec<DisplayRecord> {
    season
        .page
        .media
        .into_iter()
        .filter_map(|media| {
            let next = match media.next_airing_episode {
                Some(v) => v,
                None => {
                    debug!("Skipping media {} with no upcoming episode", media.id.0);
                    return None;
                }
            };

            let title = media
                .title
                .and_then(|t| t.user_preferred)
                .unwrap_or_else(|| format!("AniList #{}", media.id.0));

            Some(DisplayRecord {
                title,
                airing_at: next.airing_at,
                episode: EpisodeNumber(next.episode),
                // A total of 0 is as good as unknown
                total_episodes: EpisodeNumber(media.episodes.filter(|n| *n != 0)),
            })
        })
        .collect()
}

pub fn format_airing_time<Tz>(airing_at: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_opt(airing_at, 0)
        .earliest()
        .map(|t| t.format(AIRING_TIME_FORMAT).to_string())
        .unwrap_or_else(|| airing_at.to_string())
}

pub fn render<W, Tz>(
    mut records: Vec<DisplayRecord>,
    console: &mut Console<W>,
    tz: &Tz,
) -> std::io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    records.sort_by_key(|r| r.airing_at);

    let name = console.highlight("NextUp");
    console.line(format!("Here is your {name} schedule!"))?;

    if records.is_empty() {
        console.line("Nothing on your list is airing this season")?;
    }

    for record in records {
        let title = console.highlight(&record.title);
        console.line(format!(
            "{} episode {} of {} will air on {}",
            title,
            record.episode,
            record.total_episodes,
            format_airing_time(record.airing_at, tz)
        ))?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    use chrono::{FixedOffset, Utc};

    use crate::anilist::{ApiAiringEpisode, ApiMedia, ApiPage, ApiTitle};
    use crate::types::MediaId;

    fn media(id: i64, episodes: Option<i64>, next: Option<(i64, Option<i64>)>) -> ApiMedia {
        ApiMedia {
            id: MediaId(id),
            title: Some(ApiTitle {
                user_preferred: Some(format!("Show {id}")),
            }),
            episodes,
            next_airing_episode: next.map(|(airing_at, episode)| ApiAiringEpisode {
                airing_at,
                episode,
            }),
        }
    }

    fn record(title: &str, airing_at: i64) -> DisplayRecord {
        DisplayRecord {
            title: title.to_string(),
            airing_at,
            episode: EpisodeNumber(Some(1)),
            total_episodes: EpisodeNumber(Some(12)),
        }
    }

    #[test]
    fn test_placeholders() {
        let season = CurrentSeason {
            page: ApiPage {
                media: vec![
                    media(1, Some(0), Some((100, None))),
                    media(2, None, Some((200, Some(4)))),
                    media(3, Some(24), Some((300, Some(5)))),
                ],
            },
        };

        let records = to_display_records(season);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].episode, EpisodeNumber(None));
        assert_eq!(records[0].total_episodes, EpisodeNumber(None));
        assert_eq!(records[1].episode, EpisodeNumber(Some(4)));
        assert_eq!(records[1].total_episodes, EpisodeNumber(None));
        assert_eq!(records[2].total_episodes, EpisodeNumber(Some(24)));
    }

    #[test]
    fn test_media_without_upcoming_episode_is_skipped() {
        let mut untitled = media(2, Some(12), Some((50, Some(1))));
        untitled.title = None;
        let season = CurrentSeason {
            page: ApiPage {
                media: vec![media(1, Some(12), None), untitled],
            },
        };

        let records = to_display_records(season);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "AniList #2");
    }

    #[test]
    fn test_format_airing_time() {
        assert_eq!(format_airing_time(1700000000, &Utc), "Tue (14/11) at 10:13 PM");

        let tokyo = FixedOffset::east_opt(9 * 3600).expect("Invalid offset");
        assert_eq!(format_airing_time(1700000000, &tokyo), "Wed (15/11) at 07:13 AM");

        let formatted = format_airing_time(1700000000, &chrono::Local);
        let (weekday, rest) = formatted.split_at(3);
        assert!(weekday.chars().all(|c| c.is_ascii_alphabetic()));
        let rest: Vec<&str> = rest.split(' ').collect();
        assert_eq!(rest.len(), 5, "unexpected layout {formatted}");
        assert!(rest[0].is_empty());
        assert_eq!(rest[1].len(), "(DD/MM)".len());
        assert_eq!(rest[2], "at");
        assert_eq!(rest[3].len(), "HH:MM".len());
        assert!(rest[4] == "AM" || rest[4] == "PM");
    }

    #[test]
    fn test_render_sorts_by_airing_time() {
        let records = vec![record("c", 300), record("a", 100), record("b", 200)];
        let mut console = Console::new(Vec::new(), false);
        render(records, &mut console, &Utc).expect("Failed to render");

        let out = String::from_utf8(console.into_inner()).expect("Invalid utf8");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Here is your NextUp schedule!");
        let titles: Vec<&str> = lines[1..]
            .iter()
            .map(|l| l.split(' ').next().unwrap_or_default())
            .collect();
        assert_eq!(titles, ["a", "b", "c"]);
        assert_eq!(
            lines[1],
            "a episode 1 of 12 will air on Thu (01/01) at 12:01 AM"
        );
    }

    #[test]
    fn test_render_empty_schedule() {
        let mut console = Console::new(Vec::new(), false);
        render(Vec::new(), &mut console, &Utc).expect("Failed to render");

        let out = String::from_utf8(console.into_inner()).expect("Invalid utf8");
        assert_eq!(
            out,
            "Here is your NextUp schedule!\nNothing on your list is airing this season\n"
        );
    }
}
