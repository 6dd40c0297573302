//! Porter stemmer
//!
//! Implements the five-step suffix-stripping algorithm from M. F. Porter,
//! "An algorithm for suffix stripping" (1980). Only ASCII lowercase words
//! longer than two characters are stemmed; anything else (digits, non-ASCII
//! letters) is returned unchanged.

/// Stem a single lowercase token
pub fn stem(word: &str) -> String {
    if word.len() <= 2 || !word.bytes().all(|c| c.is_ascii_lowercase()) {
        return word.to_string();
    }

    let mut w = Word {
        b: word.as_bytes().to_vec(),
    };
    w.step1a();
    w.step1b();
    w.step1c();
    w.step2();
    w.step3();
    w.step4();
    w.step5a();
    w.step5b();

    // Only ASCII bytes are ever written
    String::from_utf8(w.b).unwrap_or_else(|_| word.to_string())
}

struct Word {
    b: Vec<u8>,
}

impl Word {
    fn is_consonant(&self, i: usize) -> bool {
        match self.b[i] {
            b'a' | b'e' | b'i' | b'o' | b'u' => false,
            b'y' => i == 0 || !self.is_consonant(i - 1),
            _ => true,
        }
    }

    /// Number of VC sequences in the first `len` bytes: [C](VC){m}[V]
    fn measure(&self, len: usize) -> usize {
        let mut n = 0;
        let mut i = 0;

        while i < len && self.is_consonant(i) {
            i += 1;
        }
        loop {
            while i < len && !self.is_consonant(i) {
                i += 1;
            }
            if i >= len {
                return n;
            }
            while i < len && self.is_consonant(i) {
                i += 1;
            }
            n += 1;
        }
    }

    fn has_vowel(&self, len: usize) -> bool {
        (0..len).any(|i| !self.is_consonant(i))
    }

    fn ends_double_consonant(&self, len: usize) -> bool {
        len >= 2 && self.b[len - 1] == self.b[len - 2] && self.is_consonant(len - 1)
    }

    /// consonant-vowel-consonant ending, where the final consonant is not w, x or y
    fn ends_cvc(&self, len: usize) -> bool {
        if len < 3 {
            return false;
        }
        if !self.is_consonant(len - 3) || self.is_consonant(len - 2) || !self.is_consonant(len - 1)
        {
            return false;
        }
        !matches!(self.b[len - 1], b'w' | b'x' | b'y')
    }

    fn ends_with(&self, suffix: &str) -> bool {
        self.b.ends_with(suffix.as_bytes())
    }

    /// Length of the stem left after removing `suffix`
    fn stem_len(&self, suffix: &str) -> usize {
        self.b.len() - suffix.len()
    }

    fn replace_suffix(&mut self, suffix: &str, replacement: &str) {
        let len = self.stem_len(suffix);
        self.b.truncate(len);
        self.b.extend_from_slice(replacement.as_bytes());
    }

    /// Apply the first rule whose suffix matches, if the remaining stem's
    /// measure exceeds `min_measure`. Later rules are not tried once one matches.
    fn apply_rules(&mut self, rules: &[(&str, &str)], min_measure: usize) {
        for (suffix, replacement) in rules {
            if self.ends_with(suffix) {
                if self.measure(self.stem_len(suffix)) > min_measure {
                    self.replace_suffix(suffix, replacement);
                }
                return;
            }
        }
    }

    fn step1a(&mut self) {
        if self.ends_with("sses") {
            self.replace_suffix("sses", "ss");
        } else if self.ends_with("ies") {
            self.replace_suffix("ies", "i");
        } else if self.ends_with("ss") {
            // unchanged
        } else if self.ends_with("s") {
            self.replace_suffix("s", "");
        }
    }

    fn step1b(&mut self) {
        if self.ends_with("eed") {
            if self.measure(self.stem_len("eed")) > 0 {
                self.replace_suffix("eed", "ee");
            }
            return;
        }

        let stripped = if self.ends_with("ed") && self.has_vowel(self.stem_len("ed")) {
            self.replace_suffix("ed", "");
            true
        } else if self.ends_with("ing") && self.has_vowel(self.stem_len("ing")) {
            self.replace_suffix("ing", "");
            true
        } else {
            false
        };

        if !stripped {
            return;
        }

        if self.ends_with("at") {
            self.replace_suffix("at", "ate");
        } else if self.ends_with("bl") {
            self.replace_suffix("bl", "ble");
        } else if self.ends_with("iz") {
            self.replace_suffix("iz", "ize");
        } else if self.ends_double_consonant(self.b.len())
            && !matches!(self.b[self.b.len() - 1], b'l' | b's' | b'z')
        {
            self.b.pop();
        } else if self.measure(self.b.len()) == 1 && self.ends_cvc(self.b.len()) {
            self.b.push(b'e');
        }
    }

    fn step1c(&mut self) {
        if self.ends_with("y") && self.has_vowel(self.stem_len("y")) {
            self.replace_suffix("y", "i");
        }
    }

    fn step2(&mut self) {
        const RULES: &[(&str, &str)] = &[
            ("ational", "ate"),
            ("tional", "tion"),
            ("enci", "ence"),
            ("anci", "ance"),
            ("izer", "ize"),
            ("abli", "able"),
            ("alli", "al"),
            ("entli", "ent"),
            ("eli", "e"),
            ("ousli", "ous"),
            ("ization", "ize"),
            ("ation", "ate"),
            ("ator", "ate"),
            ("alism", "al"),
            ("iveness", "ive"),
            ("fulness", "ful"),
            ("ousness", "ous"),
            ("aliti", "al"),
            ("iviti", "ive"),
            ("biliti", "ble"),
        ];
        self.apply_rules(RULES, 0);
    }

    fn step3(&mut self) {
        const RULES: &[(&str, &str)] = &[
            ("icate", "ic"),
            ("ative", ""),
            ("alize", "al"),
            ("iciti", "ic"),
            ("ical", "ic"),
            ("ful", ""),
            ("ness", ""),
        ];
        self.apply_rules(RULES, 0);
    }

    fn step4(&mut self) {
        // "ement" precedes "ment" and "ent" so the longest suffix wins
        const SUFFIXES: &[&str] = &[
            "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent",
            "ion", "ou", "ism", "ate", "iti", "ous", "ive", "ize",
        ];

        for suffix in SUFFIXES {
            if !self.ends_with(suffix) {
                continue;
            }
            let len = self.stem_len(suffix);
            if *suffix == "ion" && !(len > 0 && matches!(self.b[len - 1], b's' | b't')) {
                continue;
            }
            if self.measure(len) > 1 {
                self.b.truncate(len);
            }
            return;
        }
    }

    fn step5a(&mut self) {
        if !self.ends_with("e") {
            return;
        }
        let len = self.stem_len("e");
        let m = self.measure(len);
        if m > 1 || (m == 1 && !self.ends_cvc(len)) {
            self.b.truncate(len);
        }
    }

    fn step5b(&mut self) {
        let len = self.b.len();
        if self.measure(len) > 1 && self.ends_double_consonant(len) && self.b[len - 1] == b'l' {
            self.b.pop();
        }
    }
}
