use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Calendar-style phrases ("Today at 2:30 PM", "Last Monday at 9:00 AM").
///
/// Each phrase is a chrono strftime pattern; `%A` is replaced with the
/// localized weekday name from `weekdays` (Sunday first) before formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarPack {
    pub same_day: String,
    pub next_day: String,
    pub next_week: String,
    pub last_day: String,
    pub last_week: String,
    pub same_else: String,
    pub weekdays: Vec<String>,
}

impl CalendarPack {
    pub fn english() -> Self {
        Self {
            same_day: "Today at %-I:%M %p".to_string(),
            next_day: "Tomorrow at %-I:%M %p".to_string(),
            next_week: "%A at %-I:%M %p".to_string(),
            last_day: "Yesterday at %-I:%M %p".to_string(),
            last_week: "Last %A at %-I:%M %p".to_string(),
            same_else: "%m/%d/%Y".to_string(),
            weekdays: [
                "Sunday",
                "Monday",
                "Tuesday",
                "Wednesday",
                "Thursday",
                "Friday",
                "Saturday",
            ]
            .map(String::from)
            .to_vec(),
        }
    }

    pub fn british_english() -> Self {
        Self {
            same_day: "Today at %H:%M".to_string(),
            next_day: "Tomorrow at %H:%M".to_string(),
            next_week: "%A at %H:%M".to_string(),
            last_day: "Yesterday at %H:%M".to_string(),
            last_week: "Last %A at %H:%M".to_string(),
            same_else: "%d/%m/%Y".to_string(),
            ..Self::english()
        }
    }

    pub fn french() -> Self {
        Self {
            same_day: "Aujourd’hui à %H:%M".to_string(),
            next_day: "Demain à %H:%M".to_string(),
            next_week: "%A à %H:%M".to_string(),
            last_day: "Hier à %H:%M".to_string(),
            last_week: "%A dernier à %H:%M".to_string(),
            same_else: "%d/%m/%Y".to_string(),
            weekdays: [
                "dimanche", "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Phrase table used to render relative times in one language.
///
/// `future` and `past` wrap the duration phrase through a `%s` placeholder;
/// the plural phrases carry a `%d` placeholder for the rounded amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalePack {
    pub id: String,
    pub future: String,
    pub past: String,
    pub few_seconds: String,
    pub minute: String,
    pub minutes: String,
    pub hour: String,
    pub hours: String,
    pub day: String,
    pub days: String,
    pub month: String,
    pub months: String,
    pub year: String,
    pub years: String,
    pub calendar: CalendarPack,
}

impl LocalePack {
    pub fn english() -> Self {
        Self {
            id: "en".to_string(),
            future: "in %s".to_string(),
            past: "%s ago".to_string(),
            few_seconds: "a few seconds".to_string(),
            minute: "a minute".to_string(),
            minutes: "%d minutes".to_string(),
            hour: "an hour".to_string(),
            hours: "%d hours".to_string(),
            day: "a day".to_string(),
            days: "%d days".to_string(),
            month: "a month".to_string(),
            months: "%d months".to_string(),
            year: "a year".to_string(),
            years: "%d years".to_string(),
            calendar: CalendarPack::english(),
        }
    }

    pub fn british_english() -> Self {
        Self {
            id: "en-gb".to_string(),
            calendar: CalendarPack::british_english(),
            ..Self::english()
        }
    }

    pub fn french() -> Self {
        Self {
            id: "fr".to_string(),
            future: "dans %s".to_string(),
            past: "il y a %s".to_string(),
            few_seconds: "quelques secondes".to_string(),
            minute: "une minute".to_string(),
            minutes: "%d minutes".to_string(),
            hour: "une heure".to_string(),
            hours: "%d heures".to_string(),
            day: "un jour".to_string(),
            days: "%d jours".to_string(),
            month: "un mois".to_string(),
            months: "%d mois".to_string(),
            year: "un an".to_string(),
            years: "%d ans".to_string(),
            calendar: CalendarPack::french(),
        }
    }
}

/// Known locale packs, keyed by lowercase identifier.
#[derive(Debug, Clone)]
pub struct LocaleRegistry {
    packs: HashMap<String, LocalePack>,
}

impl Default for LocaleRegistry {
    fn default() -> Self {
        let mut registry = Self {
            packs: HashMap::new(),
        };
        registry.register(LocalePack::english());
        registry.register(LocalePack::british_english());
        registry.register(LocalePack::french());
        registry
    }
}

impl LocaleRegistry {
    pub fn register(&mut self, pack: LocalePack) {
        self.packs.insert(normalize(&pack.id), pack);
    }

    /// Find a pack by exact id, then by its language prefix (`fr-ca` -> `fr`).
    pub fn find(&self, id: &str) -> Option<&LocalePack> {
        let id = normalize(id);
        if let Some(pack) = self.packs.get(&id) {
            return Some(pack);
        }
        let lang = id.split('-').next()?;
        self.packs.get(lang)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.packs.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn normalize(id: &str) -> String {
    id.trim().replace('_', "-").to_lowercase()
}
