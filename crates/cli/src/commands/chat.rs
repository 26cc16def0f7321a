//! `tanyahr chat` — Interactive or single-question chat mode.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use tanyahr_config::AppConfig;
use tanyahr_core::extract::ContentExtractor;
use tanyahr_core::prompt::APP_NAME;
use tanyahr_engine::{ChatEngine, TurnEvent};
use tanyahr_providers::GeminiBackend;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

pub async fn run(question: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early — give a clear error
    let Some(api_key) = config.api_key.clone() else {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY='AIza...'    (recommended)");
        eprintln!("    TANYAHR_API_KEY='AIza...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  Get a Gemini key at: https://aistudio.google.com/apikey");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    };

    let mut backend = GeminiBackend::new(api_key).with_model(&config.model);
    if let Some(base_url) = &config.base_url {
        backend = backend.with_base_url(base_url);
    }
    let backend = Arc::new(backend);

    let (tx, mut rx) = mpsc::channel(64);
    let mut engine = ChatEngine::new(backend.clone(), config.temperature).with_events(tx);

    if let Some(q) = question {
        run_turn(&mut engine, &mut rx, &q).await;
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║    tanyahr — Asisten Biro SDM & Organisasi   ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Layanan: {APP_NAME}");
    println!("  Model:   {}", config.model);
    println!();
    println!("  Ketik pertanyaan Anda dan tekan Enter.");
    println!("  Perintah:");
    println!("    /add <file> [judul]  — unggah dokumen peraturan/SOP");
    println!("    /docs                — daftar dokumen terunggah");
    println!("    /remove <n>          — hapus dokumen nomor n");
    println!("    /reset               — mulai percakapan baru");
    println!("    /quit                — keluar");
    println!();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            prompt()?;
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !handle_command(&mut engine, backend.as_ref(), command).await {
                break;
            }
        } else {
            run_turn(&mut engine, &mut rx, &line).await;
        }

        prompt()?;
    }

    println!();
    println!("  Sampai jumpa!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  Anda > ");
    std::io::stdout().flush()
}

/// Drive one turn, printing events as they arrive. Protocol errors are
/// reported inline; backend failures already surface as a failed reply.
async fn run_turn(
    engine: &mut ChatEngine,
    rx: &mut mpsc::Receiver<TurnEvent>,
    text: &str,
) {
    let submit = engine.submit(text);
    tokio::pin!(submit);

    let mut result = None;
    while result.is_none() {
        tokio::select! {
            res = &mut submit => result = Some(res),
            Some(event) = rx.recv() => print_event(&event),
        }
    }
    // Events buffered after submit resolved.
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }

    if let Some(Err(e)) = result {
        eprintln!("  [!] {e}");
        println!();
    }
}

fn print_event(event: &TurnEvent) {
    match event {
        TurnEvent::Started { .. } => {
            println!();
            print!("  Asisten > ");
            let _ = std::io::stdout().flush();
        }
        TurnEvent::Fragment { text, .. } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        TurnEvent::Completed { .. } => {
            println!();
            println!();
        }
        TurnEvent::Failed { message, .. } => {
            println!("{message}");
            println!();
        }
    }
}

/// Handle a slash command. Returns false when the REPL should exit.
async fn handle_command(
    engine: &mut ChatEngine,
    extractor: &dyn ContentExtractor,
    command: &str,
) -> bool {
    let mut parts = command.split_whitespace();
    match parts.next() {
        Some("quit") | Some("exit") => return false,
        Some("reset") => {
            engine.reset();
            println!("  Percakapan baru dimulai.");
        }
        Some("docs") => {
            if engine.documents().is_empty() {
                println!("  Belum ada dokumen terunggah.");
            } else {
                for (i, doc) in engine.documents().iter().enumerate() {
                    println!("  {}. {} ({} karakter)", i + 1, doc.title, doc.content.len());
                }
            }
        }
        Some("remove") => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n >= 1 && n <= engine.documents().len() => {
                let id = engine.documents()[n - 1].id.clone();
                let title = engine.documents()[n - 1].title.clone();
                engine.remove_document(&id);
                println!("  Dokumen '{title}' dihapus.");
            }
            _ => println!("  Pemakaian: /remove <n> (lihat /docs)"),
        },
        Some("add") => {
            let Some(path) = parts.next() else {
                println!("  Pemakaian: /add <file> [judul]");
                return true;
            };
            let title = {
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    Path::new(path)
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.to_string())
                } else {
                    rest.join(" ")
                }
            };
            match load_document(extractor, path).await {
                Ok(content) => {
                    engine.add_document(&title, content);
                    println!("  Dokumen '{title}' ditambahkan ({} total).", engine.documents().len());
                }
                Err(e) => println!("  Gagal membaca dokumen: {e}"),
            }
        }
        _ => println!("  Perintah tidak dikenal: /{command}"),
    }
    true
}

/// Read a document from disk. PDFs go through the OCR extractor; anything
/// else is read as plain text.
async fn load_document(
    extractor: &dyn ContentExtractor,
    path: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let is_pdf = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        let bytes = tokio::fs::read(path).await?;
        println!("  Mengekstrak teks dari PDF ...");
        let text = extractor.extract_text(&bytes, "application/pdf").await?;
        Ok(text)
    } else {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}
