//! Keyword heuristics for genre and age rating. Rules are checked in order
//! and the first match wins; matching is substring-based on lower-cased text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeRating {
    Children,
    #[serde(rename = "Young Adult")]
    YoungAdult,
    Adult,
}

impl AgeRating {
    /// Order in which age collections are emitted.
    pub const ALL: [AgeRating; 3] = [AgeRating::Children, AgeRating::YoungAdult, AgeRating::Adult];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRating::Children => "Children",
            AgeRating::YoungAdult => "Young Adult",
            AgeRating::Adult => "Adult",
        }
    }
}

impl std::fmt::Display for AgeRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const GENRE_MYSTERY: &str = "Mystery";
pub const GENRE_FANTASY: &str = "Fantasy";
pub const GENRE_ROMANCE: &str = "Romance";
pub const GENRE_HORROR: &str = "Horror";
pub const GENRE_SCIENCE_FICTION: &str = "Science Fiction";
pub const GENRE_CHILDRENS: &str = "Children's Literature";
pub const GENRE_CLASSIC: &str = "Classic Literature";
pub const GENRE_FICTION: &str = "Fiction";

const TITLE_GENRES: &[(&[&str], &str)] = &[
    (&["mystery", "detective", "murder", "crime"], GENRE_MYSTERY),
    (&["fantasy", "wizard", "magic", "dragon"], GENRE_FANTASY),
    (&["romance", "love", "heart"], GENRE_ROMANCE),
    (&["horror", "terror", "vampire", "zombie"], GENRE_HORROR),
    (&["science", "space", "robot", "future"], GENRE_SCIENCE_FICTION),
];

const CLASSIC_AUTHORS: &[&str] = &["dickens", "austen"];

const CHILDREN_TITLE_WORDS: &[&str] = &["children", "kid", "little", "pooh", "curious george"];
const CHILDREN_TAG_WORDS: &[&str] = &["children", "picture book"];
const YOUNG_ADULT_TITLE_WORDS: &[&str] = &["hardy boys", "nancy drew", "young"];
const YOUNG_ADULT_TAG_WORDS: &[&str] = &["young adult", "ya"];
const YOUNG_ADULT_GENRES: &[&str] = &["horror", "gothic"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn joined_tags(tags: &[String]) -> String {
    tags.join(" ").to_lowercase()
}

pub fn guess_genre(title: &str, author: &str, tags: &[String]) -> &'static str {
    let title = title.to_lowercase();
    let author = author.to_lowercase();

    if let Some((_, genre)) = TITLE_GENRES
        .iter()
        .find(|(words, _)| contains_any(&title, words))
    {
        return genre;
    }
    if joined_tags(tags).contains("children") || title.contains("kid") {
        return GENRE_CHILDRENS;
    }
    if contains_any(&author, CLASSIC_AUTHORS) {
        return GENRE_CLASSIC;
    }
    GENRE_FICTION
}

pub fn guess_age_rating(title: &str, genre: &str, tags: &[String]) -> AgeRating {
    let title = title.to_lowercase();
    let genre = genre.to_lowercase();
    let tags = joined_tags(tags);

    if contains_any(&title, CHILDREN_TITLE_WORDS) || contains_any(&tags, CHILDREN_TAG_WORDS) {
        return AgeRating::Children;
    }
    if contains_any(&title, YOUNG_ADULT_TITLE_WORDS) || contains_any(&tags, YOUNG_ADULT_TAG_WORDS) {
        return AgeRating::YoungAdult;
    }
    if YOUNG_ADULT_GENRES.contains(&genre.as_str()) {
        return AgeRating::YoungAdult;
    }
    AgeRating::Adult
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classic() -> Vec<String> {
        vec!["Classic".to_string()]
    }

    #[test]
    fn plain_title_is_adult_fiction() {
        let genre = guess_genre("The Great Adventure", "Jane Doe", &classic());
        assert_eq!(genre, "Fiction");
        assert_eq!(guess_age_rating("The Great Adventure", genre, &classic()), AgeRating::Adult);
    }

    #[test]
    fn earlier_rules_win() {
        assert_eq!(guess_genre("Murder on the Dragon Express", "", &[]), "Mystery");
        assert_eq!(guess_genre("Love in Space", "", &[]), "Romance");
        assert_eq!(guess_genre("The Robot Zombie", "", &[]), "Horror");
    }

    #[test]
    fn author_rule_applies_after_title_rules() {
        assert_eq!(guess_genre("Bleak House", "Charles Dickens", &[]), "Classic Literature");
        assert_eq!(guess_genre("A Christmas Carol", "DICKENS", &[]), "Classic Literature");
        assert_eq!(guess_genre("The Haunted Heart", "Charles Dickens", &[]), "Romance");
    }

    #[test]
    fn children_genre_from_tags_or_title() {
        assert_eq!(guess_genre("Stories", "", &["Children".into()]), "Children's Literature");
        assert_eq!(guess_genre("Kidnapped", "Stevenson", &[]), "Children's Literature");
    }

    #[test]
    fn age_rules() {
        assert_eq!(guess_age_rating("Little Women", "Fiction", &[]), AgeRating::Children);
        assert_eq!(guess_age_rating("Anything", "Fiction", &["Picture Book".into()]), AgeRating::Children);
        assert_eq!(guess_age_rating("Nancy Drew and the Clock", "Mystery", &[]), AgeRating::YoungAdult);
        assert_eq!(guess_age_rating("Tales", "Fiction", &["YA".into()]), AgeRating::YoungAdult);
        assert_eq!(guess_age_rating("Dracula", "Horror", &[]), AgeRating::YoungAdult);
        assert_eq!(guess_age_rating("Carmilla", "Gothic", &[]), AgeRating::YoungAdult);
        assert_eq!(guess_age_rating("Dracula", "Fiction", &classic()), AgeRating::Adult);
    }

    #[test]
    fn age_rating_serializes_display_names() {
        assert_eq!(serde_json::to_string(&AgeRating::YoungAdult).unwrap(), "\"Young Adult\"");
        let back: AgeRating = serde_json::from_str("\"Young Adult\"").unwrap();
        assert_eq!(back, AgeRating::YoungAdult);
        assert_eq!(AgeRating::Children.to_string(), "Children");
    }

    proptest! {
        #[test]
        fn dragon_titles_are_fantasy(prefix in "[a-z ]{0,12}", suffix in "[a-z ]{0,12}", author in ".{0,20}") {
            prop_assume!(!contains_any(&prefix, TITLE_GENRES[0].0));
            prop_assume!(!contains_any(&suffix, TITLE_GENRES[0].0));
            let title = format!("{prefix}Dragon{suffix}");
            prop_assert_eq!(guess_genre(&title, &author, &classic()), "Fantasy");
        }
    }
}
