//! Prefix tree over a set of words.
//!
//! The tree only grows: there is no removal. Owners that need to drop words build a fresh
//! [`Trie`] from the complete word set and swap it in, which keeps every published snapshot
//! free of dangling branches.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
struct TrieNode {
	children: HashMap<char, TrieNode>,
	is_end_of_word: bool,
}

#[derive(Debug, Default, Clone)]
pub struct Trie {
	root: TrieNode,
	len: usize,
}

impl Trie {
	pub fn new(words: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
		let mut trie = Self::default();
		for word in words {
			trie.insert(word.as_ref());
		}
		trie
	}

	pub fn insert(&mut self, word: &str) {
		let mut current = &mut self.root;
		for c in word.chars() {
			current = current.children.entry(c).or_default();
		}

		if !current.is_end_of_word {
			current.is_end_of_word = true;
			self.len += 1;
		}
	}

	pub fn contains(&self, word: &str) -> bool {
		self.find(word).is_some_and(|node| node.is_end_of_word)
	}

	/// All inserted words starting with `prefix`, in no particular order.
	///
	/// A word equal to `prefix` is included, and an empty prefix yields every word.
	pub fn words_with_prefix(&self, prefix: &str) -> Vec<String> {
		let Some(node) = self.find(prefix) else {
			return vec![];
		};

		let mut words = Vec::new();
		let mut buffer = prefix.to_string();
		collect_words(node, &mut buffer, &mut words);
		words
	}

	/// Number of distinct words.
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	fn find(&self, prefix: &str) -> Option<&TrieNode> {
		prefix
			.chars()
			.try_fold(&self.root, |node, c| node.children.get(&c))
	}
}

fn collect_words(node: &TrieNode, buffer: &mut String, words: &mut Vec<String>) {
	if node.is_end_of_word {
		words.push(buffer.clone());
	}

	for (c, child) in &node.children {
		buffer.push(*c);
		collect_words(child, buffer, words);
		buffer.pop();
	}
}

impl<S: AsRef<str>> FromIterator<S> for Trie {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self::new(iter)
	}
}

impl<S: AsRef<str>> Extend<S> for Trie {
	fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
		for word in iter {
			self.insert(word.as_ref());
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use pretty_assertions::assert_eq;

	use super::*;

	fn set(words: Vec<String>) -> HashSet<String> {
		words.into_iter().collect()
	}

	fn expected(words: &[&str]) -> HashSet<String> {
		words.iter().map(ToString::to_string).collect()
	}

	#[test]
	fn prefix() {
		let trie = Trie::new(["one", "two"]);

		assert_eq!(set(trie.words_with_prefix("")), expected(&["one", "two"]));
		assert_eq!(set(trie.words_with_prefix("o")), expected(&["one"]));
		assert_eq!(set(trie.words_with_prefix("t")), expected(&["two"]));
		assert_eq!(set(trie.words_with_prefix("th")), expected(&[]));
	}

	#[test]
	fn prefix_collisions() {
		let trie = Trie::new(["psion", "psion/series-5"]);

		assert_eq!(
			set(trie.words_with_prefix("")),
			expected(&["psion", "psion/series-5"])
		);
		assert_eq!(
			set(trie.words_with_prefix("p")),
			expected(&["psion", "psion/series-5"])
		);
		assert_eq!(
			set(trie.words_with_prefix("psio")),
			expected(&["psion", "psion/series-5"])
		);
		assert_eq!(
			set(trie.words_with_prefix("psion")),
			expected(&["psion", "psion/series-5"])
		);
		assert_eq!(
			set(trie.words_with_prefix("psion/")),
			expected(&["psion/series-5"])
		);
		assert_eq!(set(trie.words_with_prefix("psiona")), expected(&[]));
	}

	#[test]
	fn contains_only_whole_words() {
		let trie: Trie = ["journal", "journaling"].into_iter().collect();

		assert!(trie.contains("journal"));
		assert!(trie.contains("journaling"));
		assert!(!trie.contains("journ"));
		assert!(!trie.contains("journals"));
		assert!(!trie.contains(""));
	}

	#[test]
	fn duplicate_inserts_are_counted_once() {
		let mut trie = Trie::default();
		assert!(trie.is_empty());

		trie.insert("mac");
		trie.insert("mac");
		trie.extend(["macos", "mac"]);

		assert_eq!(trie.len(), 2);
		assert_eq!(
			set(trie.words_with_prefix("mac")),
			expected(&["mac", "macos"])
		);
	}

	#[test]
	fn empty_word_is_a_valid_member() {
		let trie = Trie::new([""]);

		assert!(trie.contains(""));
		assert_eq!(trie.words_with_prefix(""), vec![String::new()]);
	}

	#[test]
	fn multibyte_characters() {
		let trie = Trie::new(["café", "cafés", "caffè"]);

		assert_eq!(
			set(trie.words_with_prefix("caf")),
			expected(&["café", "cafés", "caffè"])
		);
		assert_eq!(set(trie.words_with_prefix("café")), expected(&["café", "cafés"]));
	}

	#[test]
	fn every_prefix_of_every_word_finds_exactly_the_matching_words() {
		let words = [
			"software",
			"soft",
			"apple",
			"app",
			"mac",
			"markdown",
			"journaling",
			"psion/series-5",
		];
		let trie = Trie::new(words);

		for word in words {
			for end in 0..=word.len() {
				if !word.is_char_boundary(end) {
					continue;
				}
				let prefix = &word[..end];
				let matching = words
					.iter()
					.filter(|candidate| candidate.starts_with(prefix))
					.map(ToString::to_string)
					.collect::<HashSet<_>>();

				assert_eq!(set(trie.words_with_prefix(prefix)), matching, "prefix {prefix:?}");
			}
		}
	}
}
