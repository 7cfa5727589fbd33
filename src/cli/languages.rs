use repograph::indexer::parser::ParserRegistry;

pub fn list_languages() {
    let registry = ParserRegistry::new();
    println!("Supported languages:");
    for language in registry.supported_languages() {
        println!("  {:<12} {}", language.name(), language.extensions().join(", "));
    }
}
