fn main() {
    if let Err(e) = clinical_narrative_lib::run() {
        tracing::error!(error = %e, "clinical-narrative failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
