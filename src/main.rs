use clap::Parser;
use cv_sorter::{cli, config, error, export, master_list, pipeline};
use cli::{Cli, Commands};
use config::Config;
use cv_sorter_common::MatchOptions;
use error::Result;

fn init_tracing(verbose: bool) {
    let rust_log = std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV).ok();
    let directives = cli::log_directives(verbose, rust_log.as_deref());
    let filter = tracing_subscriber::EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("RUST_LOG を解釈できません ({}): {}", directives, e);
        tracing_subscriber::EnvFilter::new("warn")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Sort {
            master,
            master_b,
            unsorted,
            out,
            audit,
            threshold,
            style,
            rich_out,
            audit_xlsx,
            profile,
        } => {
            println!("📋 cv-sorter - 分類\n");

            let style = config.with_style(&style);
            let options = MatchOptions {
                threshold: threshold.unwrap_or(config.threshold),
                profile: profile.resolve(master_b.is_some()),
            };
            let request = pipeline::SortRequest {
                master,
                master_b,
                unsorted,
                options,
                end_marker: config.section_end.clone(),
            };
            let outputs = export::SortOutputs {
                text: out,
                audit_tsv: audit,
                audit_xlsx,
                rich_json: rich_out,
            };

            println!("[1/2] 照合中... (閾値: {:.2}, プロファイル: {})", options.threshold, profile);
            let (categorization, _) = pipeline::categorize_files(&request)?;
            let unmatched = categorization.unmatched_count();
            println!(
                "✔ {}件中 {}件を分類, 未分類 {}件\n",
                categorization.audit.len(),
                categorization.audit.len() - unmatched,
                unmatched
            );
            pipeline::report_alignment(categorization.alignment);

            println!("[2/2] 出力中...");
            export::export_categorization(&categorization, &outputs, &style)?;

            println!("\n✅ 分類完了");
        }

        Commands::Master {
            csv,
            out_c,
            out_b,
            has_header,
        } => {
            println!("📋 cv-sorter - マスタ変換\n");
            let out_b = out_b.unwrap_or_else(|| master_list::default_secondary_path(&out_c));
            let texts = pipeline::convert_master(&csv, &out_c, &out_b, has_header)?;
            println!("✔ 見出し {}件, 試験 {}件", texts.headers, texts.studies);
            println!("✔ C列マスタ: {}", out_c.display());
            println!("✔ B列マスタ: {}", out_b.display());
        }

        Commands::Extract {
            cv,
            out,
            section_start,
            section_end,
        } => {
            println!("📋 cv-sorter - 研究歴抽出\n");
            let start = section_start.unwrap_or_else(|| config.section_start.clone());
            let end = section_end.unwrap_or_else(|| config.section_end.clone());
            let count = pipeline::extract_file(&cv, &out, &start, &end)?;
            println!("✔ {}件の試験を抽出: {}", count, out.display());
        }

        Commands::Resolve {
            cv,
            csv,
            in_unsorted,
            out_unsorted,
            section_start,
            section_end,
            threshold,
            audit,
        } => {
            println!("📋 cv-sorter - 年なし行の補完\n");
            let request = pipeline::ResolveRequest {
                cv,
                csv,
                in_unsorted,
                out_unsorted,
                section_start: section_start.unwrap_or_else(|| config.section_start.clone()),
                section_end: section_end.unwrap_or_else(|| config.section_end.clone()),
                threshold: threshold.unwrap_or(config.resolve_threshold),
                audit,
            };
            let outcome = pipeline::resolve_files(&request)?;
            println!("✔ {}件中 {}件を補完", outcome.candidates, outcome.resolved.len());
            println!("✔ 未整理リスト ({}件): {}", outcome.merged.len(), request.out_unsorted.display());
            if let Some(path) = &request.audit {
                println!("✔ 監査TSV: {}", path.display());
            }
        }

        Commands::Run {
            cv,
            csv,
            out_dir,
            has_header,
            threshold,
            style,
        } => {
            println!("🚀 cv-sorter - 一括処理\n");
            let mut config = config.with_style(&style);
            if let Some(threshold) = threshold {
                config.threshold = threshold;
            }
            let manifest = pipeline::run_all(&cv, &csv, &out_dir, has_header, &config)?;
            println!(
                "\n✔ 分類 {}件, 未分類 {}件",
                manifest.counts.matched, manifest.counts.unmatched
            );
            println!("✔ 実行記録: {}", out_dir.join(export::manifest::MANIFEST_FILE_NAME).display());
            println!("\n✅ 完了");
        }

        Commands::Config {
            show,
            set_threshold,
            set_indent_size,
        } => {
            let mut config = config;

            if let Some(threshold) = set_threshold {
                config.set_threshold(threshold)?;
                println!("✔ 閾値を設定しました: {:.2}", threshold);
            }

            if let Some(size) = set_indent_size {
                config.set_indent_size(size)?;
                println!("✔ 空白数を設定しました: {}", size);
            }

            if show || (set_threshold.is_none() && set_indent_size.is_none()) {
                println!("設定 ({}):", Config::config_path()?.display());
                println!("  閾値: {:.2}", config.threshold);
                println!("  補完の閾値: {:.2}", config.resolve_threshold);
                println!("  区切り: {} x{}", config.indent_type, config.indent_size);
                println!("  太字: {}", if config.bold { "有効" } else { "無効" });
                println!("  太字マーカー: {}", if config.text_bold_markers { "有効" } else { "無効" });
                println!("  ぶら下げインデント: {}in", config.docx_indent);
                println!("  セクション開始: {}", config.section_start);
                println!("  セクション終端: {}", config.section_end);
            }
        }
    }

    Ok(())
}
