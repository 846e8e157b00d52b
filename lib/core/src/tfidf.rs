// TF-IDF vectorizer over business feature text
use crate::vector::SparseVector;
use ahash::{AHashMap, AHashSet};
use std::sync::OnceLock;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together",
    "too", "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up",
    "upon", "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when",
    "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];

fn stop_words() -> &'static AHashSet<&'static str> {
    static STOP_WORDS: OnceLock<AHashSet<&'static str>> = OnceLock::new();
    STOP_WORDS.get_or_init(|| ENGLISH_STOP_WORDS.iter().copied().collect())
}

/// Fitted TF-IDF transform.
///
/// Weights are raw term count times smoothed idf, `ln((1 + n) / (1 + df)) + 1`,
/// and every row is L2-normalized. Columns follow the sorted vocabulary, so
/// two fits over the same corpus produce identical vectors.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: AHashMap<String, u32>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Lowercase, split into runs of two or more word characters, drop stop words.
    #[inline]
    pub fn tokenize(text: &str) -> Vec<String> {
        let stop = stop_words();
        text.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|s| s.chars().count() > 1 && !stop.contains(*s))
            .map(str::to_string)
            .collect()
    }

    /// Learn vocabulary and idf weights from a corpus.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        Self::fit_transform(documents).0
    }

    /// Fit on `documents` and return the vectorizer with one row per document.
    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> (Self, Vec<SparseVector>) {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|d| Self::tokenize(d.as_ref()))
            .collect();

        let mut df: AHashMap<&str, u32> = AHashMap::new();
        for tokens in &tokenized {
            let unique: AHashSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<&str> = df.keys().copied().collect();
        terms.sort_unstable();

        let n = documents.len() as f32;
        let mut vocabulary = AHashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (column, term) in terms.iter().enumerate() {
            let doc_freq = df.get(term).copied().unwrap_or(0) as f32;
            idf.push(((1.0 + n) / (1.0 + doc_freq)).ln() + 1.0);
            vocabulary.insert((*term).to_string(), column as u32);
        }

        let vectorizer = Self { vocabulary, idf };
        let rows = tokenized
            .iter()
            .map(|tokens| vectorizer.weigh(tokens))
            .collect();
        (vectorizer, rows)
    }

    /// Vectorize text with the fitted vocabulary; unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&Self::tokenize(text))
    }

    #[inline]
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let pairs = tokens
            .iter()
            .filter_map(|t| self.vocabulary.get(t.as_str()))
            .map(|&column| (column, self.idf[column as usize]))
            .collect();
        let mut vector = SparseVector::from_pairs(pairs);
        vector.normalize();
        vector
    }
}
