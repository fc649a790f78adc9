//! Merging collected outcomes into a report of stable shape, and rendering
//! that report into text.

use std::fmt;

use crate::llm::ReportRenderer;
use crate::sources::types::{Event, Headline, ResolvedLocation, TimeInfo, WeatherInfo};
use crate::workflow::state::{FailureReason, Intent, SourceOutcome, SourceResults};

pub const LOCAL_TIME_PLACEHOLDER: &str = "Local time unavailable";
pub const WEATHER_PLACEHOLDER: &str = "Weather unavailable";
pub const NEWS_PLACEHOLDER: &str = "News unavailable";
pub const EVENTS_PLACEHOLDER: &str = "Events unavailable";

pub const UNLOCATED_MESSAGE: &str = "Sorry, I couldn't determine the location in your question. \
Please try again with a specific city or place name.";

const OUTDOOR_KEYWORDS: &[&str] = &[
    "outdoor",
    "open-air",
    "open air",
    "park",
    "garden",
    "beach",
    "festival",
    "hike",
    "market",
    "street",
    "picnic",
];
const WET_WEATHER: &[&str] = &["rain", "drizzle", "shower", "storm", "thunder", "snow", "sleet"];
const FAIR_WEATHER: &[&str] = &["clear", "sun"];

/// One report section: the payload, or a fixed placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Available(T),
    Unavailable {
        placeholder: &'static str,
        /// `None` when the source never ran.
        reason: Option<FailureReason>,
    },
}

impl<T> Section<T> {
    fn from_outcome(outcome: &SourceOutcome<T>, placeholder: &'static str) -> Self
    where
        T: Clone,
    {
        match outcome {
            SourceOutcome::Success(value) => Section::Available(value.clone()),
            SourceOutcome::Failure(reason) => Section::Unavailable {
                placeholder,
                reason: Some(*reason),
            },
            SourceOutcome::Skipped => Section::Unavailable {
                placeholder,
                reason: None,
            },
        }
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Section::Available(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }

    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Section::Available(_) => None,
            Section::Unavailable { placeholder, .. } => Some(placeholder),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedReport {
    pub location: ResolvedLocation,
    pub local_time: Section<TimeInfo>,
    pub weather: Section<WeatherInfo>,
    pub news: Section<Vec<Headline>>,
    pub events: Section<Vec<Event>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// The location could not be resolved; nothing else is reported.
    Unlocated { message: String },
    Located(LocatedReport),
}

/// Build the structured report. Pure: the same inputs always give the same
/// report.
pub fn aggregate(location: Option<&ResolvedLocation>, results: &SourceResults) -> Report {
    let Some(location) = location else {
        return Report::Unlocated {
            message: UNLOCATED_MESSAGE.to_string(),
        };
    };

    let weather = Section::from_outcome(&results.weather, WEATHER_PLACEHOLDER);
    let events = match &results.events {
        SourceOutcome::Success(events) => {
            Section::Available(refine_events(events, weather.available()))
        }
        other => Section::from_outcome(other, EVENTS_PLACEHOLDER),
    };

    Report::Located(LocatedReport {
        location: location.clone(),
        local_time: Section::from_outcome(&results.local_time, LOCAL_TIME_PLACEHOLDER),
        weather,
        news: Section::from_outcome(&results.news, NEWS_PLACEHOLDER),
        events,
    })
}

fn is_outdoor(event: &Event) -> bool {
    let text = format!("{} {}", event.title, event.description).to_lowercase();
    OUTDOOR_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Drop outdoor events in wet weather; list them first in fair weather.
fn refine_events(events: &[Event], weather: Option<&WeatherInfo>) -> Vec<Event> {
    let Some(weather) = weather else {
        return events.to_vec();
    };
    let summary = weather.summary.to_lowercase();

    if WET_WEATHER.iter().any(|w| summary.contains(w)) {
        events.iter().filter(|e| !is_outdoor(e)).cloned().collect()
    } else if FAIR_WEATHER.iter().any(|w| summary.contains(w)) {
        let (mut outdoor, indoor): (Vec<_>, Vec<_>) =
            events.iter().cloned().partition(is_outdoor);
        outdoor.extend(indoor);
        outdoor
    } else {
        events.to_vec()
    }
}

impl LocatedReport {
    /// Placeholders of every unavailable section, in report order.
    pub fn placeholders(&self) -> Vec<&'static str> {
        [
            self.local_time.placeholder(),
            self.weather.placeholder(),
            self.news.placeholder(),
            self.events.placeholder(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Unlocated { message } => f.write_str(message),
            Report::Located(report) => fmt::Display::fmt(report, f),
        }
    }
}

impl fmt::Display for LocatedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location: {}", self.location.display_name)?;

        match &self.local_time {
            Section::Available(time) => write!(
                f,
                "\nLocal time: {} ({})",
                time.local_time.format("%A %Y-%m-%d %H:%M"),
                time.timezone
            )?,
            Section::Unavailable { placeholder, .. } => write!(f, "\n{placeholder}")?,
        }

        match &self.weather {
            Section::Available(weather) => {
                f.write_str("\nWeather: ")?;
                write_weather(f, weather)?;
            }
            Section::Unavailable { placeholder, .. } => write!(f, "\n{placeholder}")?,
        }

        match &self.news {
            Section::Available(headlines) if headlines.is_empty() => {
                f.write_str("\nNews: no headlines found")?
            }
            Section::Available(headlines) => {
                f.write_str("\nNews:")?;
                for headline in headlines {
                    match &headline.source {
                        Some(source) => write!(f, "\n- {} ({source})", headline.title)?,
                        None => write!(f, "\n- {}", headline.title)?,
                    }
                }
            }
            Section::Unavailable { placeholder, .. } => write!(f, "\n{placeholder}")?,
        }

        match &self.events {
            Section::Available(events) if events.is_empty() => {
                f.write_str("\nEvents: no events found")
            }
            Section::Available(events) => {
                f.write_str("\nEvents:")?;
                for event in events {
                    f.write_str("\n")?;
                    write_event(f, event)?;
                }
                Ok(())
            }
            Section::Unavailable { placeholder, .. } => write!(f, "\n{placeholder}"),
        }
    }
}

fn write_weather(f: &mut fmt::Formatter<'_>, weather: &WeatherInfo) -> fmt::Result {
    f.write_str(&weather.summary)?;
    if let Some(temp) = weather.temperature_c {
        write!(f, ", {temp:.1}°C")?;
    }
    if let Some(feels_like) = weather.feels_like_c {
        write!(f, " (feels like {feels_like:.1}°C)")?;
    }
    if let Some(humidity) = weather.humidity {
        write!(f, ", humidity {humidity}%")?;
    }
    if let Some(wind) = weather.wind_speed {
        write!(f, ", wind {wind} m/s")?;
    }
    Ok(())
}

fn write_event(f: &mut fmt::Formatter<'_>, event: &Event) -> fmt::Result {
    write!(f, "- {}", event.title)?;
    if let Some(date) = &event.date {
        write!(f, " - {date}")?;
    }
    if let Some(venue) = &event.venue {
        write!(f, " at {venue}")?;
    }
    if !event.description.is_empty() {
        write!(f, "\n  {}", event.description)?;
    }
    if let Some(url) = &event.url {
        write!(f, "\n  More info: {url}")?;
    }
    Ok(())
}

/// Templated plain-text rendering. Also serves as the context handed to the
/// text-generation collaborator.
pub fn render_plain(report: &Report) -> String {
    report.to_string().trim_end().to_string()
}

/// Text shown to the user plus a note when rendering had to fall back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub fallback_note: Option<String>,
}

/// Render through the text-generation collaborator, falling back to the
/// templated text on any failure. Unlocated reports are returned verbatim.
/// Placeholders the collaborator left out are appended to its text, so an
/// unavailable section is never silently dropped.
pub async fn render(renderer: &dyn ReportRenderer, intent: Intent, report: &Report) -> Rendered {
    let located = match report {
        Report::Unlocated { message } => {
            return Rendered {
                text: message.clone(),
                fallback_note: None,
            }
        }
        Report::Located(located) => located,
    };

    match renderer.render(intent, report).await {
        Ok(text) if !text.trim().is_empty() => keep_placeholders(text, located),
        Ok(_) => {
            tracing::warn!("Renderer returned empty text, using templated report");
            Rendered {
                text: render_plain(report),
                fallback_note: Some("report renderer returned empty text".to_string()),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Report rendering failed, using templated report");
            Rendered {
                text: render_plain(report),
                fallback_note: Some(format!("report rendering unavailable: {e}")),
            }
        }
    }
}

fn keep_placeholders(text: String, report: &LocatedReport) -> Rendered {
    let missing: Vec<_> = report
        .placeholders()
        .into_iter()
        .filter(|placeholder| !text.contains(placeholder))
        .collect();
    if missing.is_empty() {
        return Rendered {
            text,
            fallback_note: None,
        };
    }

    tracing::warn!(
        missing = ?missing,
        "Renderer omitted unavailable sections, appending placeholders"
    );
    let mut text = text.trim_end().to_string();
    text.push('\n');
    for placeholder in &missing {
        text.push('\n');
        text.push_str(placeholder);
    }
    Rendered {
        text,
        fallback_note: Some(format!(
            "report renderer omitted unavailable sections: {}",
            missing.join(", ")
        )),
    }
}
