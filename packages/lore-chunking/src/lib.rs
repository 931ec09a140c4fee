use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub chunk_size: u32,
	pub chunk_overlap: u32,
}

#[derive(Clone, Debug)]
pub struct Chunk {
	pub chunk_index: i32,
	pub start_offset: usize,
	pub end_offset: usize,
	pub text: String,
}

/// Splits `text` into chunks of at most `chunk_size` characters, preferring paragraph boundaries,
/// then sentence boundaries, then a hard cut. Consecutive chunks share up to `chunk_overlap`
/// trailing characters where the size cap allows. Offsets are byte positions into `text`, and the
/// output is deterministic for identical input.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let max_chars = cfg.chunk_size as usize;
	let overlap_chars = (cfg.chunk_overlap as usize).min(max_chars.saturating_sub(1));
	let units = split_units(text, max_chars);
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_chars = 0_usize;
	let mut current_start = 0_usize;
	let mut last_end = 0_usize;
	let mut chunk_index = 0_i32;

	for (idx, unit) in units {
		let unit_chars = unit.chars().count();

		if current_chars + unit_chars > max_chars && !current.is_empty() {
			chunks.push(Chunk {
				chunk_index,
				start_offset: current_start,
				end_offset: last_end,
				text: current.clone(),
			});

			chunk_index += 1;

			// The retained tail is shrunk so the next chunk never exceeds the size cap.
			let budget = max_chars.saturating_sub(unit_chars);
			let tail = overlap_tail(&current, overlap_chars.min(budget));

			current_start = last_end - tail.len();
			current_chars = tail.chars().count();
			current = tail;
		}
		if current.is_empty() {
			current_start = idx;
		}

		current.push_str(unit);

		current_chars += unit_chars;
		last_end = idx + unit.len();
	}

	if !current.is_empty() {
		chunks.push(Chunk {
			chunk_index,
			start_offset: current_start,
			end_offset: last_end,
			text: current,
		});
	}

	chunks
}

/// Boundary units in ascending offset order. Paragraphs that fit the cap stay whole; oversized
/// paragraphs fall back to sentences, and oversized sentences to fixed-width pieces.
fn split_units(text: &str, max_chars: usize) -> Vec<(usize, &str)> {
	let mut units = Vec::new();

	for (paragraph_start, paragraph) in paragraph_units(text) {
		if paragraph.chars().count() <= max_chars {
			units.push((paragraph_start, paragraph));

			continue;
		}

		for (sentence_idx, sentence) in paragraph.split_sentence_bound_indices() {
			let sentence_start = paragraph_start + sentence_idx;

			if sentence.chars().count() <= max_chars {
				units.push((sentence_start, sentence));
			} else {
				hard_pieces(sentence_start, sentence, max_chars, &mut units);
			}
		}
	}

	units
}

fn paragraph_units(text: &str) -> Vec<(usize, &str)> {
	let mut units = Vec::new();
	let mut start = 0_usize;

	while let Some(pos) = text[start..].find("\n\n") {
		let end = start + pos + 2;

		units.push((start, &text[start..end]));

		start = end;
	}

	if start < text.len() {
		units.push((start, &text[start..]));
	}

	units
}

fn hard_pieces<'t>(
	base: usize,
	text: &'t str,
	max_chars: usize,
	units: &mut Vec<(usize, &'t str)>,
) {
	let mut piece_start = 0_usize;
	let mut count = 0_usize;

	for (idx, _) in text.char_indices() {
		if count == max_chars {
			units.push((base + piece_start, &text[piece_start..idx]));

			piece_start = idx;
			count = 0;
		}

		count += 1;
	}

	if piece_start < text.len() {
		units.push((base + piece_start, &text[piece_start..]));
	}
}

fn overlap_tail(text: &str, overlap_chars: usize) -> String {
	if overlap_chars == 0 {
		return String::new();
	}

	let total = text.chars().count();
	let skip = total.saturating_sub(overlap_chars);

	match text.char_indices().nth(skip) {
		Some((idx, _)) => text[idx..].to_string(),
		None => String::new(),
	}
}
