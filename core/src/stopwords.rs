//! Embedded stopword corpora for the analyzer.
//!
//! Membership is tested against normalized (lowercased, letters-only)
//! tokens, so multi-word or apostrophe entries simply never match.

pub const ENGLISH: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "me", "more", "most", "my", "myself", "no", "nor", "not", "of", "off",
    "on", "once", "only", "or", "other", "ought", "our", "ours", "ourselves", "out", "over",
    "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "with", "would", "you", "your",
    "yours", "yourself", "yourselves",
];

pub const SPANISH: &[&str] = &[
    "a", "al", "algo", "algunas", "algunos", "ante", "antes", "como", "con", "contra", "cual",
    "cuando", "de", "del", "desde", "donde", "durante", "e", "el", "ella", "ellas", "ellos",
    "en", "entre", "era", "erais", "eran", "eras", "eres", "es", "esa", "esas", "ese", "eso",
    "esos", "esta", "estaba", "estabais", "estaban", "estabas", "estad", "estada", "estadas",
    "estado", "estados", "estamos", "estando", "estar", "estas", "este", "esto", "estos",
    "estoy", "fue", "fueron", "fui", "fuimos", "ha", "habida", "habidas", "habido", "habidos",
    "habiendo", "han", "has", "hasta", "hay", "haya", "hayamos", "hayan", "hayas", "he",
    "hemos", "hube", "hubo", "la", "las", "le", "les", "lo", "los", "me", "mi", "mis", "mucho",
    "muchos", "muy", "nada", "ni", "no", "nos", "nosotras", "nosotros", "nuestra", "nuestras",
    "nuestro", "nuestros", "o", "os", "otra", "otras", "otro", "otros", "para", "pero", "poco",
    "por", "porque", "que", "quien", "quienes", "se", "sea", "seamos", "sean", "seas", "ser",
    "si", "sido", "siendo", "sin", "sobre", "sois", "somos", "son", "soy", "su", "sus", "suya",
    "suyas", "suyo", "suyos", "también", "tanto", "te", "tenemos", "tengo", "ti", "tiene",
    "tienen", "tienes", "todo", "todos", "tu", "tus", "tuya", "tuyas", "tuyo", "tuyos", "un",
    "una", "uno", "unos", "vosotras", "vosotros", "vuestra", "vuestras", "vuestro", "vuestros",
    "y", "ya", "yo", "él", "éramos", "ésta", "éstas", "éste", "éstos", "más", "mía", "mías",
    "mío", "míos", "sí", "tú",
];
