//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::dictionary::{Dictionary, DictionaryHandle};

/// A small slice of CMUdict covering the words the tests use.
pub const SAMPLE_DICT: &str = "\
;;; test fixture, entries copied from cmudict-0.7b
AND  AH0 N D
ARE  AA1 R
BLUE  B L UW1
BRIGHT  B R AY1 T
DELIGHT  D IH0 L AY1 T
FLIGHT  F L AY1 T
GLUE  G L UW1
IS  IH1 Z
KITE  K AY1 T
LIGHT  L AY1 T
MIGHT  M AY1 T
MORNING  M AO1 R N IH0 NG
NIGHT  N AY1 T
RED  R EH1 D
ROSES  R OW1 Z AH0 Z
ROSES(1)  R OW1 Z IH0 Z
SHOE  SH UW1
SIGHT  S AY1 T
SO  S OW1
SUGAR  SH UH1 G ER0
SWEET  S W IY1 T
THE  DH AH0
TONIGHT  T AH0 N AY1 T
TRUE  T R UW1
VIOLETS  V AY1 AH0 L AH0 T S
WHITE  W AY1 T
WINDOW  W IH1 N D OW0
YOU  Y UW1
";

/// The sample dictionary, in memory.
pub fn sample_dictionary() -> Dictionary {
    Dictionary::from_source_text(SAMPLE_DICT).expect("fixture parses")
}

/// A handle already holding the sample dictionary.
pub fn sample_handle() -> Arc<DictionaryHandle> {
    Arc::new(DictionaryHandle::prebuilt(sample_dictionary()))
}
