//! SSML rendering for avatar speech
//!
//! Utterance text is spliced into a fixed SSML envelope with the configured
//! voice and an optional trailing silence. Text is XML-escaped before
//! splicing; nothing else in the envelope is caller-controlled.

/// Escape text for inclusion in SSML element content
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#47;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render one utterance to SSML for the given voice
///
/// `ending_silence_ms` of zero omits the trailing break element.
pub fn build_ssml(text: &str, voice: &str, ending_silence_ms: u64) -> String {
    let escaped = xml_escape(text);
    let ending_break = if ending_silence_ms > 0 {
        format!("<break time='{ending_silence_ms}ms' />")
    } else {
        String::new()
    };
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' \
         xmlns:mstts='http://www.w3.org/2001/mstts' xml:lang='en-US'>\
         <voice name='{voice}'>\
         <mstts:ttsembedding>\
         <mstts:leadingsilence-exact value='0'/>\
         {escaped}{ending_break}\
         </mstts:ttsembedding>\
         </voice></speak>"
    )
}
