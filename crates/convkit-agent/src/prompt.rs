use std::fmt::Write;

use convkit_core::types::ChunkMatch;

/// User prompt carrying the retrieved sources followed by the question.
pub fn build_query_with_chunks(query: &str, chunks: &[ChunkMatch]) -> String {
    let mut out = String::from(
        "Answer the question using the sources below. Cite sources by their number, \
         and say so if the sources do not contain the answer.\n\n<sources>\n",
    );
    for (i, c) in chunks.iter().enumerate() {
        let chunk = c.chunk();
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            "<source id=\"{}\" title=\"{}\" mime_type=\"{}\">\n{}\n</source>",
            i + 1,
            chunk.title,
            chunk.mime_type,
            chunk.content.trim()
        );
    }
    out.push_str("</sources>\n\nQuestion: ");
    out.push_str(query);
    out
}
