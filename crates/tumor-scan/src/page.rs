use crate::history::{History, HistoryItem};
use crate::infer::ResultType;
use crate::upload::{ALLOWED_EXTENSIONS, STATIC_ROUTE};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write;

fn history_entry(out: &mut String, item: &HistoryItem) {
	let class = match item.result_type {
		ResultType::Healthy => "healthy",
		ResultType::Tumor => "tumor",
	};
	let src = format!("{STATIC_ROUTE}/uploads/{}", item.filepath);

	let _ = write!(
		out,
		r#"<li class="history-item {class}" tabindex="0" data-filepath="{src}" data-filename="{filename_attr}" data-result="{result_attr}" data-result-type="{class}" data-confidence="{confidence:.2}">
<img src="{src}" alt="MRI scan" loading="lazy">
<div class="history-details"><span class="history-filename">{filename}</span> <span class="history-result">{result}</span> <span class="history-confidence">{confidence:.1}%</span> <time>{timestamp}</time></div>
</li>
"#,
		src = attr(&src),
		filename_attr = attr(&item.filename),
		result_attr = attr(&item.result),
		filename = text(&item.filename),
		result = text(&item.result),
		confidence = item.confidence,
		timestamp = text(&item.timestamp),
	);
}

/// The single page of the app, with the session's past scans.
pub fn index(history: &History) -> String {
	let mut entries = String::new();
	if history.is_empty() {
		entries.push_str("<li class=\"empty-history\">No scans yet</li>\n");
	}
	for item in history.items() {
		history_entry(&mut entries, item);
	}

	let accept = ALLOWED_EXTENSIONS.iter().map(|ext| format!(".{ext}")).collect::<Vec<_>>().join(",");

	format!(
		r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Brain Tumor Detection</title>
</head>
<body>
<main>
<h1>Brain Tumor Detection</h1>
<form id="uploadForm" enctype="multipart/form-data">
<input id="fileInput" type="file" name="file" accept="{accept}" required>
<button id="checkBtn" type="submit">Analyze</button>
<button id="resetBtn" type="button">Reset</button>
</form>
<section id="analysisResults" hidden>
<img id="previewImage" alt="Uploaded scan">
<h2 id="resultTitle"></h2>
<p id="confidenceText"></p>
<ul id="probabilityBars"></ul>
</section>
<section>
<h2>History</h2>
<button id="clearHistoryBtn" type="button">Clear history</button>
<ul id="historyContent">
{entries}</ul>
</section>
</main>
<script src="{STATIC_ROUTE}/js/app.js"></script>
</body>
</html>
"#
	)
}
