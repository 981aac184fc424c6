use std::{collections::HashSet, fmt::Display};

use super::{BookList, ListedBook};

const KEY_SEPARATOR: char = '|';

/// De-duplication identity of a book: trimmed, lower-cased title and author
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnedBookKey(String);

impl OwnedBookKey {
    pub fn new(title: &str, author: &str) -> Self {
        Self(format!(
            "{}{}{}",
            normalize(title),
            KEY_SEPARATOR,
            normalize(author)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnedBookKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Every book the user owns across their private and public lists.
///
/// Keys are unique; `books` keeps the first occurrence of each key in the
/// order the lists were given (private lists first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnedLibrary {
    books: Vec<ListedBook>,
    keys: HashSet<OwnedBookKey>,
}

impl OwnedLibrary {
    /// Merges the user's private and public list documents
    pub fn aggregate(private_lists: &[BookList], public_lists: &[BookList]) -> Self {
        let mut library = Self::default();

        for book in private_lists
            .iter()
            .chain(public_lists.iter())
            .flat_map(|list| list.books.iter())
        {
            if library.keys.insert(OwnedBookKey::new(&book.title, &book.author)) {
                library.books.push(book.clone());
            }
        }

        library
    }

    pub fn contains(&self, key: &OwnedBookKey) -> bool {
        self.keys.contains(key)
    }

    pub fn owns(&self, title: &str, author: &str) -> bool {
        self.contains(&OwnedBookKey::new(title, author))
    }

    pub fn books(&self) -> &[ListedBook] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Renders the library as `"<title> by <author>"` lines for summarization
    pub fn to_prompt_text(&self) -> String {
        self.books
            .iter()
            .map(|book| format!("{} by {}", book.title, book.author))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
