/// Single-page grid UI served from memory.
///
/// One cell per classified domain; plain click recovers a missing icon and
/// swaps it in, modifier-click opens the page in a new tab without touching
/// the classifier. The trailing line carries the audit summary.
pub const GRID_PAGE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>favlens</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 2rem; background: #fafafa; }
  #grid { display: flex; flex-wrap: wrap; gap: 8px; }
  .cell { width: 72px; text-align: center; cursor: pointer; }
  .cell img { width: 32px; height: 32px; image-rendering: pixelated; }
  .cell.missing img { opacity: 0.3; }
  .cell .domain { font-size: 10px; word-break: break-all; }
  #summary { margin-top: 1rem; color: #444; }
</style>
</head>
<body>
<h1>favlens</h1>
<button id="run">Run audit</button>
<div id="grid"></div>
<p id="summary"></p>
<script>
const grid = document.getElementById('grid');
const summary = document.getElementById('summary');
const cells = new Map();

function cellFor(domain) {
  let cell = cells.get(domain);
  if (cell) return cell;
  cell = document.createElement('div');
  cell.className = 'cell';
  const img = document.createElement('img');
  const label = document.createElement('div');
  label.className = 'domain';
  label.textContent = domain;
  cell.appendChild(img);
  cell.appendChild(label);
  cell.addEventListener('click', (event) => {
    if (event.ctrlKey || event.metaKey || event.shiftKey) {
      window.open('https://' + domain + '/', '_blank');
      return;
    }
    recover(domain);
  });
  grid.appendChild(cell);
  cells.set(domain, cell);
  return cell;
}

function refreshIcon(domain) {
  const cell = cellFor(domain);
  cell.querySelector('img').src = '/icon/' + encodeURIComponent(domain) + '?v=' + Date.now();
}

async function recover(domain) {
  const response = await fetch('/api/recover', {
    method: 'POST',
    headers: { 'content-type': 'application/json' },
    body: JSON.stringify({ domain }),
  });
  if (!response.ok) return;
  const outcome = await response.json();
  if (outcome.result === 'recovered') {
    cellFor(domain).classList.remove('missing');
    refreshIcon(domain);
  }
}

const source = new EventSource('/audit/sse');
source.addEventListener('icon.classified', (event) => {
  const patch = JSON.parse(event.data);
  const cell = cellFor(patch.data.domain);
  cell.classList.toggle('missing', patch.data.verdict === 'missing');
  refreshIcon(patch.data.domain);
});
source.addEventListener('icon.recovered', (event) => {
  const patch = JSON.parse(event.data);
  cellFor(patch.data.domain).classList.remove('missing');
  refreshIcon(patch.data.domain);
});
source.addEventListener('audit.completed', (event) => {
  const s = JSON.parse(event.data).data.summary;
  summary.textContent = s.bookmarks_total + ' bookmarks, ' + s.domains_total +
    ' domains, ' + s.missing + ' missing, ' + s.recovered + ' recovered in ' +
    s.elapsed_ms + ' ms';
});

document.getElementById('run').addEventListener('click', () => {
  fetch('/api/audit', { method: 'POST' });
});
</script>
</body>
</html>
"#;
