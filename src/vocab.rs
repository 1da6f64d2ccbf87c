//! Static vocabulary and precompiled line patterns.
//!
//! Everything here is immutable after first use: the regexes are compiled once
//! (`once_cell::sync::Lazy`) and the word sets are built once into a shared
//! [`Vocabulary`] that scorers receive by reference. No per-call regex work.
//!
//! All word lookups go through [`normalize_word`] (diacritics/tatweel removed,
//! alef variants unified, lowercase), so the sets below store normalized forms.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

// ----------------------------
// Precompiled patterns
// ----------------------------

/// Ceremonial opening line, optionally wrapped in braces. Matched on diacritic-free text.
pub static INVOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*[{﴿]?\s*بسم\s+ا?لله\s+الرحمن\s+الرحيم\s*[}﴾]?\s*$")
        .expect("invocation regex")
});

/// Numbered heading marker with optional inline detail in `rest`.
pub static HEADING_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:المشهد|مشهد|scene)\s*(?:رقم\s*)?(?P<num>[0-9٠-٩]+)\b\s*(?P<rest>.*)$")
        .expect("heading regex")
});

/// Scene-transition vocabulary: a keyword followed only by modifiers.
pub static TRANSITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:قطع|مزج|انتقال|اختفاء|ظهور|اظلام|تلاشي|cut|fade|dissolve|smash\s+cut|match\s+cut)(?:\s+(?:تدريجي|تدريجيا|سريع|مباشر|الي|الى|to|in|out|black))*\s*[:.]?\s*$",
    )
    .expect("transition regex")
});

/// Entire line wrapped in parentheses (ASCII or full-width).
pub static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[(（].*[)）]\s*$").expect("parenthetical regex"));

/// `NAME: speech` on a single line.
pub static INLINE_DIALOGUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<name>[^:：\s][^:：]{0,29}?)\s*[:：]\s*(?P<speech>\S.*)$")
        .expect("inline dialogue regex")
});

// ----------------------------
// Character-level helpers
// ----------------------------

/// Arabic harakat, superscript alef and tatweel.
#[inline]
pub fn is_diacritic(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}')
}

#[inline]
pub fn is_dash(c: char) -> bool {
    matches!(c, '-' | '–' | '—' | '−')
}

#[inline]
pub fn is_colon(c: char) -> bool {
    matches!(c, ':' | '：')
}

#[inline]
pub fn is_sentence_punct(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '؟' | '…')
}

/// Remove diacritics and unify letter variants; keeps spacing and punctuation.
pub fn strip_diacritics(s: &str) -> String {
    s.chars()
        .filter(|c| !is_diacritic(*c))
        .map(|c| match c {
            'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
            'ى' => 'ي',
            other => other,
        })
        .collect()
}

/// Normalized lookup form of a single word.
pub fn normalize_word(w: &str) -> String {
    strip_diacritics(w)
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Normalized words of a line (splits on anything that is not a letter/digit).
pub fn words(text: &str) -> Vec<String> {
    strip_diacritics(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Whitespace word count (what a reader would count).
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphanumeric()))
        .count()
}

/// Normalized key for names (characters, places): no diacritics, no trailing
/// colon/punctuation, single spaces, lowercase.
pub fn normalize_name(s: &str) -> String {
    let stripped = strip_diacritics(s);
    let trimmed = stripped
        .trim()
        .trim_end_matches(|c: char| is_colon(c) || is_sentence_punct(c) || c.is_whitespace())
        .trim_start_matches(|c: char| is_dash(c) || c.is_whitespace());
    trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn ends_with_colon(text: &str) -> bool {
    text.trim_end().chars().last().is_some_and(is_colon)
}

pub fn has_sentence_punct(text: &str) -> bool {
    text.chars().any(is_sentence_punct)
}

pub fn ends_with_sentence_punct(text: &str) -> bool {
    text.trim_end()
        .trim_end_matches(['"', '»', '\'', ')'])
        .chars()
        .last()
        .is_some_and(is_sentence_punct)
}

pub fn ends_with_ellipsis(text: &str) -> bool {
    let t = text.trim_end();
    t.ends_with("...") || t.ends_with('…')
}

pub fn starts_with_dash(text: &str) -> bool {
    text.trim_start().chars().next().is_some_and(is_dash)
}

/// Split at the last dash that is not the first visible character.
/// Returns `(before, after)` with both sides trimmed.
pub fn split_interior_dash(text: &str) -> Option<(&str, &str)> {
    let t = text.trim();
    let lead = t.len() - t.trim_start_matches(|c: char| is_dash(c) || c.is_whitespace()).len();
    let (pos, ch) = t
        .char_indices()
        .filter(|(i, c)| *i >= lead && is_dash(*c))
        .last()?;
    if pos == 0 {
        return None;
    }
    Some((t[..pos].trim(), t[pos + ch.len_utf8()..].trim()))
}

// ----------------------------
// Word sets
// ----------------------------

/// Third-person masculine present forms; feminine and plural forms are derived.
const ACTION_VERB_STEMS: &[&str] = &[
    "يدخل", "يخرج", "ينظر", "يجلس", "يقف", "يمشي", "يركض", "يفتح", "يغلق", "يلتفت",
    "يبتسم", "يضحك", "يبكي", "يصرخ", "يمسك", "يضع", "ياخذ", "يرفع", "يقترب", "يبتعد",
    "يتحرك", "ينهض", "يسقط", "يظهر", "يختفي", "يرن", "يطرق", "يقرا", "يكتب", "يشرب",
    "ياكل", "يعود", "يصل", "يغادر", "يتجه", "يجري", "يلتقط", "يسير", "يحمل", "يدير",
    "يضرب", "يصعد", "ينزل", "يهز", "يشير", "يتنهد", "يحدق", "يقفز", "يستيقظ", "ينام",
    "يرمي", "يسحب", "يدفع", "يعانق", "يقبل", "يصمت", "يتوقف", "يمد", "يلمس", "يخلع",
    "يرتدي", "يغني", "يرقص", "يهرب", "يتبع", "يراقب", "يستدير", "ينحني", "يتقدم", "يتراجع",
];

/// Fixed first-person/descriptive openers.
const ACTION_OPENERS: &[&str] = &["نري", "نسمع", "نشاهد", "نلاحظ", "الكاميرا", "صوت", "لقطة"];

const PLACE_WORDS: &[&str] = &[
    "بيت", "منزل", "غرفة", "مكتب", "شارع", "مطبخ", "حديقة", "مستشفي", "مدرسة", "سيارة",
    "مقهي", "مطعم", "سوق", "قصر", "شقة", "صالة", "صالون", "ممر", "محل", "مسجد",
    "فندق", "ساحة", "حمام", "سطح", "مصنع", "محطة", "مطار", "جامعة", "مخزن", "كوخ",
    "مزرعة", "شاطئ", "بحر", "نهر", "غابة", "صحراء", "جبل", "قرية", "مدينة", "زقاق",
    "كنيسة", "سجن", "زنزانة", "محكمة", "بنك", "متجر", "ملعب", "نادي", "مسرح", "استوديو",
    "مكتبة", "معمل", "مختبر", "مخبز", "ورشة", "مبني", "عمارة", "بهو", "حجرة", "شرفة",
    "بلكونة", "مدخل", "طريق", "ميدان", "جسر", "كافيتريا", "قاعة", "مقبرة", "مستودع", "عيادة",
    "house", "room", "office", "street", "kitchen", "garden", "hospital", "school", "car", "cafe",
];

const TIME_WORDS: &[&str] = &[
    "ليل", "ليلا", "ليلة", "نهار", "نهارا", "صباح", "صباحا", "مساء", "مساءا", "فجر",
    "فجرا", "ظهر", "ظهرا", "عصر", "عصرا", "غروب", "شروق", "لاحقا", "مستمر",
    "night", "day", "morning", "evening", "dawn", "dusk", "noon", "later", "continuous",
];

const INT_EXT_WORDS: &[&str] = &["داخلي", "خارجي", "داخلية", "خارجية", "int", "ext"];

const LOCATIVE_PREFIXES: &[&str] = &[
    "في", "داخل", "امام", "خلف", "عند", "فوق", "تحت", "بجوار", "قرب", "بالقرب", "وسط", "حول",
];

/// Immutable word sets shared by every scorer in a process.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    action_verbs: HashSet<String>,
    place_words: HashSet<String>,
    time_words: HashSet<String>,
    int_ext_words: HashSet<String>,
    locatives: HashSet<String>,
}

static BUILTIN: Lazy<Arc<Vocabulary>> = Lazy::new(|| Arc::new(Vocabulary::builtin()));

impl Vocabulary {
    /// Shared built-in vocabulary (built once per process).
    pub fn shared() -> Arc<Vocabulary> {
        Arc::clone(&BUILTIN)
    }

    pub fn builtin() -> Self {
        let mut action_verbs = HashSet::new();
        for stem in ACTION_VERB_STEMS {
            let stem = normalize_word(stem);
            if let Some(rest) = stem.strip_prefix('ي') {
                action_verbs.insert(format!("ت{rest}"));
                action_verbs.insert(format!("ي{rest}ون"));
                action_verbs.insert(format!("ت{rest}ان"));
            }
            action_verbs.insert(stem);
        }
        action_verbs.extend(ACTION_OPENERS.iter().map(|w| normalize_word(w)));

        let set = |list: &[&str]| list.iter().map(|w| normalize_word(w)).collect::<HashSet<_>>();
        Self {
            action_verbs,
            place_words: set(PLACE_WORDS),
            time_words: set(TIME_WORDS),
            int_ext_words: set(INT_EXT_WORDS),
            locatives: set(LOCATIVE_PREFIXES),
        }
    }

    /// Dictionary action verb, tolerating a leading conjunction (و / ف).
    pub fn is_action_verb(&self, word: &str) -> bool {
        let w = normalize_word(word);
        if w.is_empty() {
            return false;
        }
        if self.action_verbs.contains(&w) {
            return true;
        }
        ["و", "ف"]
            .iter()
            .filter_map(|p| w.strip_prefix(p))
            .any(|rest| self.action_verbs.contains(rest))
    }

    /// First visible word of a line is a dictionary action verb.
    pub fn starts_with_action_verb(&self, text: &str) -> bool {
        words(text)
            .first()
            .is_some_and(|first| self.is_action_verb(first))
    }

    /// Action-start pattern: a verb opener, optionally after "ثم" (then).
    pub fn starts_with_action(&self, text: &str) -> bool {
        let ws = words(text);
        match ws.as_slice() {
            [first, ..] if self.is_action_verb(first) => true,
            [then, second, ..] if then == "ثم" => self.is_action_verb(second),
            _ => false,
        }
    }

    fn in_set(set: &HashSet<String>, word: &str) -> bool {
        let w = normalize_word(word);
        if set.contains(&w) {
            return true;
        }
        // Definite article and attached prepositions: ال / وال / بال / فال / لل
        ["وال", "بال", "فال", "ال", "لل", "و", "ب"]
            .iter()
            .filter_map(|p| w.strip_prefix(p))
            .any(|rest| !rest.is_empty() && set.contains(rest))
    }

    pub fn is_place_word(&self, word: &str) -> bool {
        Self::in_set(&self.place_words, word)
    }

    pub fn is_time_word(&self, word: &str) -> bool {
        Self::in_set(&self.time_words, word)
    }

    pub fn is_int_ext_word(&self, word: &str) -> bool {
        self.int_ext_words.contains(&normalize_word(word))
    }

    pub fn contains_place_word(&self, text: &str) -> bool {
        words(text).iter().any(|w| self.is_place_word(w))
    }

    /// Interior/exterior or time-of-day vocabulary anywhere in the line.
    pub fn contains_time_detail(&self, text: &str) -> bool {
        words(text)
            .iter()
            .any(|w| self.is_time_word(w) || self.is_int_ext_word(w))
    }

    pub fn contains_time_word(&self, text: &str) -> bool {
        words(text).iter().any(|w| self.is_time_word(w))
    }

    pub fn contains_int_ext(&self, text: &str) -> bool {
        words(text).iter().any(|w| self.is_int_ext_word(w))
    }

    pub fn starts_with_locative(&self, text: &str) -> bool {
        words(text)
            .first()
            .is_some_and(|w| self.locatives.contains(w.as_str()))
    }
}

// ----------------------------
// Closed-form line tests
// ----------------------------

pub fn is_invocation(line: &str) -> bool {
    INVOCATION_RE.is_match(&strip_diacritics(line))
}

pub fn is_transition(line: &str) -> bool {
    TRANSITION_RE.is_match(&strip_diacritics(line))
}

pub fn is_parenthetical_shape(line: &str) -> bool {
    PARENTHETICAL_RE.is_match(line)
}

/// `(scene number, inline rest)` when the line opens a heading.
pub fn heading_start(line: &str) -> Option<(String, String)> {
    let caps = HEADING_START_RE.captures(line)?;
    let num = caps.name("num")?.as_str().to_string();
    let rest = caps
        .name("rest")
        .map(|m| m.as_str())
        .unwrap_or("")
        .trim_start_matches(|c: char| {
            is_dash(c) || is_colon(c) || c.is_whitespace() || matches!(c, '.' | ',' | '،')
        })
        .trim_end()
        .to_string();
    Some((num, rest))
}

/// `NAME: speech` with a short (≤3 words) name part.
pub fn inline_dialogue(line: &str) -> Option<(&str, &str)> {
    let caps = INLINE_DIALOGUE_RE.captures(line)?;
    let name = caps.name("name")?.as_str().trim();
    let speech = caps.name("speech")?.as_str().trim();
    if word_count(name) > 3 || heading_start(line).is_some() {
        return None;
    }
    Some((name, speech))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_with_braces_and_diacritics() {
        assert!(is_invocation("بسم الله الرحمن الرحيم"));
        assert!(is_invocation("{ بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ }"));
        assert!(!is_invocation("بسم الله الرحمن الرحيم وبعد"));
    }

    #[test]
    fn heading_start_splits_number_and_rest() {
        let (n, rest) = heading_start("مشهد 12 - داخلي - بيت أحمد - ليل").unwrap();
        assert_eq!(n, "12");
        assert!(rest.starts_with("داخلي"));
        assert_eq!(heading_start("مشهد 1"), Some(("1".to_string(), String::new())));
        assert!(heading_start("Scene 3:").is_some_and(|(_, rest)| rest.is_empty()));
        assert!(heading_start("مشهدان جميلان").is_none());
    }

    #[test]
    fn transitions_need_modifier_only_tail() {
        assert!(is_transition("قطع إلى:"));
        assert!(is_transition("CUT TO:"));
        assert!(is_transition("مزج"));
        assert!(!is_transition("قطع الخبز بالسكين"));
    }

    #[test]
    fn verbs_with_conjunction_and_feminine_forms() {
        let v = Vocabulary::builtin();
        assert!(v.is_action_verb("يدخل"));
        assert!(v.is_action_verb("تدخل"));
        assert!(v.is_action_verb("ويدخل"));
        assert!(v.is_action_verb("يخرجون"));
        assert!(!v.is_action_verb("أحمد"));
        assert!(v.starts_with_action("ثم ينظر حوله"));
    }

    #[test]
    fn places_with_article() {
        let v = Vocabulary::builtin();
        assert!(v.is_place_word("الغرفة"));
        assert!(v.is_place_word("بيت"));
        assert!(v.contains_time_detail("بيت أحمد - ليلاً"));
        assert!(v.contains_int_ext("داخلي/خارجي"));
        assert!(v.starts_with_locative("أمام المدرسة"));
    }

    #[test]
    fn interior_dash_split() {
        assert_eq!(split_interior_dash("بيت أحمد - ليل"), Some(("بيت أحمد", "ليل")));
        assert_eq!(split_interior_dash("- مرحبا"), None);
        assert_eq!(split_interior_dash("الغرفة -"), Some(("الغرفة", "")));
    }

    #[test]
    fn names_normalize() {
        assert_eq!(normalize_name("  أحمد :"), "احمد");
        assert_eq!(normalize_name("سارة   علي"), "سارة علي");
    }

    #[test]
    fn inline_dialogue_detects_short_names() {
        assert_eq!(inline_dialogue("أحمد: مرحبا"), Some(("أحمد", "مرحبا")));
        assert!(inline_dialogue("مشهد 1: بيت").is_none());
    }
}
