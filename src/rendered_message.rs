//! Rendered messages as they are sent into the room. Every message carries a
//! formatted html body and a plaintext fallback derived from it.

use matrix_sdk::ruma::events::room::message::RoomMessageEventContent;

/// size limit of [RenderedMessage] in bytes, html and plaintext combined
pub const MAX_MESSAGE_CONTENT_LEN: usize = 40000;

/// block level tags which end a line in the plaintext fallback
const LINE_BREAKING_TAGS: &[&str] =
	&["br", "/p", "/div", "/li", "/tr", "/h1", "/h2", "/h3", "/h4", "/h5", "/h6", "/pre", "hr"];

#[derive(Default, Debug, Clone, PartialEq, Eq)]
/// content of a single m.room.message event
pub struct RenderedMessage {
	/// html message content
	html: String,
	/// plaintext message content
	plain: String,
}

impl RenderedMessage {
	/// Constructs a message from formatted content, the plaintext fallback is
	/// the html with all markup stripped. Falls back to
	/// [RenderedMessage::truncated] if the message would be too large.
	pub fn from_html(html: String) -> Self {
		let plain = html_to_plain(&html);

		if html.len() + plain.len() > MAX_MESSAGE_CONTENT_LEN {
			tracing::warn!(
				"rendered message has {} bytes, truncating it to plaintext",
				html.len() + plain.len()
			);
			return Self::truncated(plain);
		}

		Self { html, plain }
	}

	/// truncate message if it exceeds [MAX_MESSAGE_CONTENT_LEN]
	/// we only allow to specify a plain text message because it's hard to
	/// truncate html messages without breaking stuff
	///
	/// The html body is the escaped plaintext, so every character is counted
	/// with its escaped length as well.
	pub fn truncated(plain: String) -> Self {
		let mut buf = [0; 4];
		let mut size = 0;
		let mut end = 0;

		for (idx, c) in plain.char_indices() {
			let encoded = c.encode_utf8(&mut buf);
			let cost = encoded.len() + tera::escape_html(encoded).len();
			if size + cost > MAX_MESSAGE_CONTENT_LEN {
				break;
			}
			size += cost;
			end = idx + encoded.len();
		}

		let plain = plain[..end].to_owned();

		Self { html: tera::escape_html(&plain), plain }
	}

	pub fn html(&self) -> &str {
		&self.html
	}

	pub fn plain(&self) -> &str {
		&self.plain
	}

	/// shortened plaintext for log lines
	pub fn preview(&self, max_len: usize) -> &str {
		truncate_str(&self.plain, max_len)
	}
}

impl From<&RenderedMessage> for RoomMessageEventContent {
	fn from(msg: &RenderedMessage) -> Self {
		RoomMessageEventContent::text_html(msg.plain(), msg.html())
	}
}

/// longest prefix of `s` with at most `max_len` bytes that doesn't split a
/// character
fn truncate_str(s: &str, max_len: usize) -> &str {
	if s.len() <= max_len {
		return s;
	}

	let mut end = max_len;
	while !s.is_char_boundary(end) {
		end -= 1;
	}

	&s[..end]
}

/// Strips markup from `html`. Line breaking tags become newlines and
/// character references are decoded.
pub fn html_to_plain(html: &str) -> String {
	let mut text = String::with_capacity(html.len());
	let mut rest = html;

	while let Some(start) = rest.find('<') {
		text.push_str(&rest[..start]);

		let Some(len) = rest[start..].find('>') else {
			// unterminated tag, keep it as text
			text.push_str(&rest[start..]);
			rest = "";
			break;
		};

		let tag = rest[start + 1..start + len].trim().to_ascii_lowercase();
		let name = tag.trim_end_matches('/').split_whitespace().next().unwrap_or_default();

		if LINE_BREAKING_TAGS.contains(&name) {
			text.push('\n');
		}

		rest = &rest[start + len + 1..];
	}
	text.push_str(rest);

	decode_entities(&text).trim().to_owned()
}

/// decodes named and numeric character references
fn decode_entities(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut rest = text;

	while let Some(start) = rest.find('&') {
		out.push_str(&rest[..start]);
		rest = &rest[start..];

		let decoded = rest
			.find(';')
			.filter(|end| *end <= 10)
			.and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));

		match decoded {
			Some((c, end)) => {
				out.push(c);
				rest = &rest[end + 1..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);

	out
}

fn decode_entity(entity: &str) -> Option<char> {
	match entity {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some(' '),
		_ => {
			let code = entity.strip_prefix('#')?;
			let code = match code.strip_prefix(&['x', 'X'][..]) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => code.parse().ok()?,
			};
			char::from_u32(code)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_tags_and_breaks_lines() {
		let html = "<strong><font color=\"#ff0000\">FIRING</font></strong> db &gt;&gt; disk full<br/>second line<br>third";

		assert_eq!(html_to_plain(html), "FIRING db >> disk full\nsecond line\nthird");
	}

	#[test]
	fn decodes_tera_escapes() {
		let escaped = tera::escape_html("a < b & \"c\" / 'd'");

		assert_eq!(html_to_plain(&escaped), "a < b & \"c\" / 'd'");
	}

	#[test]
	fn keeps_unknown_entities_and_stray_brackets() {
		assert_eq!(html_to_plain("R&D &bogus; 3 > 2"), "R&D &bogus; 3 > 2");
		assert_eq!(html_to_plain("1 <2"), "1 <2");
	}

	#[test]
	fn oversized_message_is_truncated_to_plaintext() {
		let html = format!("<b>{}</b>", "é".repeat(MAX_MESSAGE_CONTENT_LEN));

		let message = RenderedMessage::from_html(html);

		assert!(message.html().len() + message.plain().len() <= MAX_MESSAGE_CONTENT_LEN);
		assert!(message.plain().len() <= MAX_MESSAGE_CONTENT_LEN / 2);
		assert!(!message.html().contains("<b>"));
	}

	#[test]
	fn truncation_accounts_for_escaping() {
		for c in ["<", "/", "&"] {
			let html = tera::escape_html(&c.repeat(30000));

			let message = RenderedMessage::from_html(html);

			assert!(message.html().len() + message.plain().len() <= MAX_MESSAGE_CONTENT_LEN);
			assert!(!message.plain().is_empty());
			assert!(message.plain().chars().all(|ch| ch.to_string() == c));
			assert_eq!(message.html(), tera::escape_html(message.plain()));
		}
	}

	#[test]
	fn preview_respects_char_boundaries() {
		let message = RenderedMessage::from_html("äöü".to_owned());

		assert_eq!(message.preview(3), "ä");
		assert_eq!(message.preview(100), "äöü");
	}
}
