use std::sync::LazyLock;

use regex::Regex;

use crate::lesson::PLACEHOLDER;

struct Idiom {
    prep: &'static str,
    pattern: &'static str,
    note: &'static str,
}

/// Fixed phrases checked against the sentence with the answer filled in.
/// Ordered; the first match for the gap's preposition wins.
const IDIOMS: &[Idiom] = &[
    Idiom { prep: "by", pattern: r"(?i)\bby\s+chance\b", note: "'By chance' is an idiom meaning 'accidentally' or 'unexpectedly'." },
    Idiom { prep: "by", pattern: r"(?i)\bby\s+heart\b", note: "'By heart' means 'from memory' or 'memorized completely'." },
    Idiom { prep: "by", pattern: r"(?i)\bby\s+mistake\b", note: "'By mistake' means 'accidentally' or 'in error'." },
    Idiom { prep: "by", pattern: r"(?i)\bby\s+hand\b", note: "'By hand' means 'manually' or 'without machines'." },
    Idiom { prep: "by", pattern: r"(?i)\bby\s+accident\b", note: "'By accident' means 'unintentionally' or 'without planning'." },
    Idiom { prep: "by", pattern: r"(?i)\bby\s+far\b", note: "'By far' means 'by a great amount' or 'definitely'." },
    Idiom { prep: "by", pattern: r"(?i)\bby\s+all\s+means\b", note: "'By all means' means 'certainly' or 'of course'." },
    Idiom { prep: "by", pattern: r"(?i)\bby\s+no\s+means\b", note: "'By no means' means 'definitely not' or 'not at all'." },
    Idiom { prep: "out", pattern: r"(?i)\bout\s+of\s+(the\s+)?question\b", note: "'Out of the question' means 'impossible' or 'not allowed'." },
    Idiom { prep: "out", pattern: r"(?i)\bout\s+of\s+order\b", note: "'Out of order' means 'not working' or 'broken'." },
    Idiom { prep: "out", pattern: r"(?i)\bout\s+of\s+date\b", note: "'Out of date' means 'no longer valid' or 'obsolete'." },
    Idiom { prep: "out", pattern: r"(?i)\bout\s+of\s+work\b", note: "'Out of work' means 'unemployed'." },
    Idiom { prep: "out", pattern: r"(?i)\bout\s+of\s+breath\b", note: "'Out of breath' means 'breathing heavily after exertion'." },
    Idiom { prep: "out", pattern: r"(?i)\bout\s+of\s+touch\b", note: "'Out of touch' means 'not informed' or 'not in contact'." },
    Idiom { prep: "out", pattern: r"(?i)\bout\s+of\s+reach\b", note: "'Out of reach' means 'too far away to touch or obtain'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+time\b", note: "'In time' means 'early enough' or 'before it's too late'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+advance\b", note: "'In advance' means 'beforehand' or 'ahead of time'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+common\b", note: "'In common' means 'shared' or 'having the same features'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+charge\b", note: "'In charge' means 'responsible for' or 'in control of'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+danger\b", note: "'In danger' means 'at risk' or 'threatened'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+trouble\b", note: "'In trouble' means 'having problems' or 'in difficulty'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+love\b", note: "'In love' means 'feeling romantic love for someone'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+fact\b", note: "'In fact' means 'actually' or 'in reality'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+general\b", note: "'In general' means 'usually' or 'as a whole'." },
    Idiom { prep: "in", pattern: r"(?i)\bin\s+particular\b", note: "'In particular' means 'especially' or 'specifically'." },
    Idiom { prep: "on", pattern: r"(?i)\bon\s+time\b", note: "'On time' means 'punctually' or 'at the scheduled time'." },
    Idiom { prep: "on", pattern: r"(?i)\bon\s+purpose\b", note: "'On purpose' means 'intentionally' or 'deliberately'." },
    Idiom { prep: "on", pattern: r"(?i)\bon\s+fire\b", note: "'On fire' means 'burning' or figuratively 'doing very well'." },
    Idiom { prep: "on", pattern: r"(?i)\bon\s+sale\b", note: "'On sale' means 'available for purchase' or 'at a reduced price'." },
    Idiom { prep: "on", pattern: r"(?i)\bon\s+holiday\b", note: "'On holiday' means 'taking time off' or 'vacationing'." },
    Idiom { prep: "on", pattern: r"(?i)\bon\s+business\b", note: "'On business' means 'for work purposes' or 'professionally'." },
    Idiom { prep: "on", pattern: r"(?i)\bon\s+average\b", note: "'On average' means 'typically' or 'as a mean value'." },
    Idiom { prep: "on", pattern: r"(?i)\bon\s+behalf\b", note: "'On behalf of' means 'representing' or 'in place of'." },
    Idiom { prep: "at", pattern: r"(?i)\bat\s+once\b", note: "'At once' means 'immediately' or 'simultaneously'." },
    Idiom { prep: "at", pattern: r"(?i)\bat\s+last\b", note: "'At last' means 'finally' or 'after a long time'." },
    Idiom { prep: "at", pattern: r"(?i)\bat\s+least\b", note: "'At least' means 'at minimum' or 'no less than'." },
    Idiom { prep: "at", pattern: r"(?i)\bat\s+first\b", note: "'At first' means 'in the beginning' or 'initially'." },
    Idiom { prep: "at", pattern: r"(?i)\bat\s+risk\b", note: "'At risk' means 'in danger' or 'vulnerable to harm'." },
    Idiom { prep: "at", pattern: r"(?i)\bat\s+ease\b", note: "'At ease' means 'relaxed' or 'comfortable'." },
    Idiom { prep: "for", pattern: r"(?i)\bfor\s+good\b", note: "'For good' means 'permanently' or 'forever'." },
    Idiom { prep: "for", pattern: r"(?i)\bfor\s+instance\b", note: "'For instance' means 'for example' or 'as an illustration'." },
    Idiom { prep: "for", pattern: r"(?i)\bfor\s+granted\b", note: "'Take for granted' means 'assume without question' or 'undervalue'." },
    Idiom { prep: "for", pattern: r"(?i)\bfor\s+sale\b", note: "'For sale' means 'available to be purchased'." },
    Idiom { prep: "under", pattern: r"(?i)\bunder\s+control\b", note: "'Under control' means 'being managed' or 'not causing problems'." },
    Idiom { prep: "under", pattern: r"(?i)\bunder\s+pressure\b", note: "'Under pressure' means 'experiencing stress' or 'being pushed to act'." },
    Idiom { prep: "under", pattern: r"(?i)\bunder\s+construction\b", note: "'Under construction' means 'being built' or 'not finished yet'." },
    Idiom { prep: "beyond", pattern: r"(?i)\bbeyond\s+belief\b", note: "'Beyond belief' means 'unbelievable' or 'incredible'." },
    Idiom { prep: "beyond", pattern: r"(?i)\bbeyond\s+doubt\b", note: "'Beyond doubt' means 'certainly' or 'unquestionably'." },
    Idiom { prep: "with", pattern: r"(?i)\bwith\s+regard\s+to\b", note: "'With regard to' means 'concerning' or 'about'." },
    Idiom { prep: "with", pattern: r"(?i)\bwith\s+respect\s+to\b", note: "'With respect to' means 'concerning' or 'in relation to'." },
    Idiom { prep: "without", pattern: r"(?i)\bwithout\s+doubt\b", note: "'Without doubt' means 'certainly' or 'definitely'." },
    Idiom { prep: "without", pattern: r"(?i)\bwithout\s+fail\b", note: "'Without fail' means 'definitely' or 'always'." },
];

static IDIOM_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| IDIOMS.iter().map(|i| Regex::new(i.pattern).unwrap()).collect());

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}\b").unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").unwrap());
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}(st|nd|rd|th)?\b").unwrap());
static TIME_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(an?\s+hour|minutes?|weeks?|months?|years?)\b").unwrap());
static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d").unwrap()
});

const WEEKDAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];
const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// One-sentence usage note for a gap. Idiom table first (matched against
/// the sentence with the answer substituted), then contextual keyword
/// rules for high-frequency prepositions, then a generic template. Pure
/// function of its inputs.
pub fn explain(correct: &str, sentence: &str) -> String {
    let prep = correct.trim().to_lowercase();
    let filled = sentence.replacen(PLACEHOLDER, &prep, 1);

    for (idiom, re) in IDIOMS.iter().zip(IDIOM_RES.iter()) {
        if idiom.prep == prep && re.is_match(&filled) {
            return idiom.note.to_string();
        }
    }

    let s = sentence.to_lowercase();
    contextual(&prep, &s).map(str::to_string).unwrap_or_else(|| {
        format!("'{}' is the correct preposition in this phrase.", capitalize(&prep))
    })
}

fn contextual(prep: &str, s: &str) -> Option<&'static str> {
    match prep {
        "at" => rule_at(s),
        "on" => rule_on(s),
        "in" => rule_in(s),
        "to" => rule_to(s),
        "for" => rule_for(s),
        "since" => rule_since(s),
        "by" => rule_by(s),
        "about" => rule_about(s),
        "during" => Some("'During' indicates something happening within a period or event (e.g., during lunch, during the movie)."),
        "while" => Some("'While' + clause indicates two actions happening at the same time."),
        "out" => rule_out(s),
        "with" => rule_with(s),
        "of" => rule_of(s),
        _ => None,
    }
}

fn rule_at(s: &str) -> Option<&'static str> {
    Some(if has_word(s, "age") {
        "Here, 'at' is used with age to indicate a specific point in someone's life."
    } else if has_any(s, &["midnight", "noon", "dawn", "dusk", "sunset", "sunrise"]) {
        "'At' is used for specific times of day like midnight, noon, etc."
    } else if has_any(s, &["moment", "present"]) {
        "'At the moment/present' means 'right now' or 'currently'."
    } else if has_word(s, "night") {
        "'At night' is a fixed expression for nighttime."
    } else if has_any(s, &["weekend", "christmas", "easter"]) {
        "'At' is used with certain holidays and weekend (in British English)."
    } else if has_any(s, &["home", "school", "work", "university", "college"]) {
        "'At' indicates being present at a location for its purpose (at school = studying, at work = working)."
    } else if has_any(s, &["station", "airport", "party", "concert"]) {
        "'At' is used for events and specific locations where activities happen."
    } else if has_any(s, &["door", "desk", "table"]) {
        "'At' indicates position next to or near something."
    } else if has_any(s, &["bottom", "top", "end", "beginning"]) {
        "'At' is used for positions at extremities or limits."
    } else if has_word(s, "corner") {
        "'At the corner' means the exact point where two streets meet."
    } else if has_any(s, &["lunch", "dinner", "breakfast"]) {
        "'At' is used with meals to mean 'at the time of' or 'during'."
    } else if NUMBER_RE.is_match(s) {
        "'At' is used with specific clock times."
    } else {
        "'At' indicates a specific point in time or place in this context."
    })
}

fn rule_on(s: &str) -> Option<&'static str> {
    Some(if has_any(s, WEEKDAYS) {
        "'On' is used with days of the week."
    } else if has_word(s, "day") && !has_word(s, "everyday") {
        "'On' is used with specific days, like 'on sunny days' or 'on Christmas Day'."
    } else if has_any(s, &["birthday", "anniversary"]) {
        "'On' is used with specific dates and anniversaries."
    } else if has_any(s, &["floor", "shelf", "wall", "ceiling"]) {
        "'On' indicates position on a surface."
    } else if has_any(s, &["left", "right"]) {
        "'On the left/right' indicates relative position or direction."
    } else if has_any(s, &["bus", "train", "plane", "ship", "boat"]) {
        "'On' is used with larger public transport vehicles."
    } else if has_any(s, &["bike", "motorcycle", "horse"]) {
        "'On' is used with vehicles you sit on top of."
    } else if has_any(s, &["tv", "television", "radio", "phone"]) {
        "'On' is used with communication devices (on TV, on the phone)."
    } else if has_any(s, &["weekday", "weekdays", "weekend", "weekends"]) {
        "'On' is used with weekdays/weekends (more common in American English)."
    } else if has_any(s, &["page", "screen", "menu", "list", "map"]) {
        "'On' is used for things displayed or written on a surface."
    } else if DATE_RE.is_match(s) || MONTH_DAY_RE.is_match(s) {
        "'On' is used with specific dates."
    } else {
        "'On' indicates a surface, specific day, or date in this context."
    })
}

fn rule_in(s: &str) -> Option<&'static str> {
    Some(if has_any(s, MONTHS) {
        "'In' is used with months of the year."
    } else if has_any(s, &["morning", "afternoon", "evening"]) {
        "'In' is used with parts of the day (except 'at night')."
    } else if has_any(s, &["spring", "summer", "autumn", "fall", "winter"]) {
        "'In' is used with seasons."
    } else if YEAR_RE.is_match(s) {
        "'In' is used with years."
    } else if has_any(s, &["century", "decade"]) {
        "'In' is used with centuries and decades."
    } else if TIME_SPAN_RE.is_match(s) {
        "'In' + time period means 'after that amount of time from now'."
    } else if has_any(s, &["car", "taxi"]) {
        "'In' is used with smaller vehicles like cars and taxis."
    } else if has_any(s, &["room", "office", "house", "building", "garden", "park", "forest"]) {
        "'In' indicates being inside or within an enclosed or defined space."
    } else if has_any(s, &["water", "sea", "river", "ocean", "pool"]) {
        "'In' is used when surrounded by water."
    } else if has_any(s, &["city", "town", "village", "country", "world"]) {
        "'In' is used with cities, towns, countries, and regions."
    } else if has_any(s, &["newspaper", "book", "magazine", "article"]) {
        "'In' is used for content appearing within publications."
    } else if has_word(s, "interested") {
        "'Interested in' is a fixed combination meaning 'having interest about'."
    } else {
        "'In' indicates being inside, within a period, or enclosed in this context."
    })
}

fn rule_to(s: &str) -> Option<&'static str> {
    Some(if has_any(s, &["go", "went", "going", "gone"]) {
        "'To' indicates the destination of movement with 'go'."
    } else if has_any(s, &["walk", "drive", "fly", "travel", "move"]) {
        "'To' indicates the direction or destination of travel."
    } else if has_word(s, "listen") {
        "'Listen to' is a fixed combination - we always listen TO something."
    } else if has_any(s, &["speak", "talk"]) {
        "'Speak/talk to' indicates the person being addressed."
    } else {
        "'To' indicates direction, movement toward, or the recipient of an action."
    })
}

fn rule_for(s: &str) -> Option<&'static str> {
    Some(if has_any(s, &[
        "hour", "hours", "day", "days", "week", "weeks", "month", "months",
        "year", "years", "minute", "minutes", "second", "seconds", "ages",
    ]) {
        "'For' indicates the duration of time something lasts."
    } else if has_any(s, &["waiting", "waited", "wait"]) {
        "'Wait for' indicates the duration of waiting."
    } else if has_word(s, "reason") {
        "'For' introduces the purpose or reason for something."
    } else {
        "'For' indicates duration, purpose, or benefit in this context."
    })
}

fn rule_since(s: &str) -> Option<&'static str> {
    Some(if YEAR_RE.is_match(s) {
        "'Since' + year indicates the starting point of an ongoing action."
    } else if has_any(s, WEEKDAYS) {
        "'Since' + day indicates from that day until now."
    } else if has_any(s, MONTHS) {
        "'Since' + month indicates from that month until now."
    } else {
        "'Since' indicates the starting point in time of something that continues to now."
    })
}

fn rule_by(s: &str) -> Option<&'static str> {
    Some(if has_any(s, &["car", "taxi", "bus", "train", "plane", "boat"]) {
        "'By' + transport (without 'the') indicates the method of travel."
    } else if has_any(s, &["tomorrow", "next", "end", "time"]) {
        "'By' + time means 'not later than' or 'before that deadline'."
    } else {
        "'By' indicates method, agent, or a deadline in this context."
    })
}

fn rule_about(s: &str) -> Option<&'static str> {
    Some(if has_any(s, &["think", "thinking", "thought"]) {
        "'Think about' means to consider or reflect on something."
    } else if has_any(s, &["talk", "talking", "talked", "speak", "speaking", "spoke"]) {
        "'Talk/speak about' means to discuss a topic."
    } else if has_any(s, &["worry", "worried", "worrying"]) {
        "'Worry about' means to feel anxious concerning something."
    } else {
        "'About' means 'concerning' or 'regarding' in this context."
    })
}

fn rule_out(s: &str) -> Option<&'static str> {
    Some(if has_any(s, &["look", "looked", "looking"]) {
        "'Look out of' means to look through a window or opening to see outside."
    } else if has_any(s, &["run", "ran", "running"]) {
        "'Run out of' means to have no more of something left."
    } else if has_any(s, &["get", "got", "getting"]) {
        "'Get out of' means to exit or leave something."
    } else if has_any(s, &["work", "job"]) {
        "'Out of work' means unemployed or without a job."
    } else {
        "'Out' indicates movement away from inside, or exhaustion/depletion."
    })
}

fn rule_with(s: &str) -> Option<&'static str> {
    Some(if has_any(s, &["covered", "cover", "covering"]) {
        "'Covered with' describes what is on top of or surrounding something."
    } else if has_any(s, &["filled", "fill", "filling"]) {
        "'Filled with' describes what something contains or is full of."
    } else if has_any(s, &["agree", "agreed", "agreeing"]) {
        "'Agree with' means to share the same opinion as someone."
    } else if has_any(s, &["angry", "annoyed", "frustrated", "pleased", "happy", "satisfied"]) {
        "'With' after emotion adjectives indicates the cause or target of the emotion."
    } else if has_any(s, &["deal", "dealing", "dealt"]) {
        "'Deal with' means to handle or manage something."
    } else if has_any(s, &["help", "helps", "helped"]) {
        "'Help with' means to assist in doing something."
    } else {
        "'With' indicates accompaniment, means, or manner in this context."
    })
}

fn rule_of(s: &str) -> Option<&'static str> {
    Some(if has_any(s, &["afraid", "scared", "frightened"]) {
        "'Afraid/scared of' indicates what causes fear."
    } else if has_word(s, "tired") {
        "'Tired of' means to be bored or frustrated with something."
    } else if has_word(s, "proud") {
        "'Proud of' indicates the source of pride."
    } else if has_any(s, &["kind", "sort", "type"]) {
        "'Kind/sort/type of' shows classification or category."
    } else {
        "'Of' indicates belonging, origin, or relationship."
    })
}

/// Whole-word containment over already-lowercased text.
fn has_word(text: &str, word: &str) -> bool {
    text.match_indices(word).any(|(i, _)| {
        let before_ok = text[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = text[i + word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

fn has_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| has_word(text, w))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ── Tests ──
