use std::{env::args, io, process::exit};

use fabula::*;

fn main() -> Result<(), io::Error> {
    let path = args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: play <story-file.fab> [story-id]");
        exit(1);
    });

    let registry = CallRegistry::new();
    let mut logger = Logger::default();

    let stories = read_stories_from_file(&path, &registry, &mut logger)
        .unwrap_or_else(|err| {
            eprintln!("error: {}", err);
            exit(1);
        });

    for message in logger.iter() {
        eprintln!("{}", message);
    }

    let story = match args().nth(2) {
        Some(id) => stories
            .iter()
            .find(|story| story.id() == id.trim().to_lowercase()),
        None => stories.iter().find(|story| !story.is_snippet()),
    };

    let story = story.unwrap_or_else(|| {
        eprintln!("no story found in {}", path);
        exit(1);
    });

    play_story(&registry, story);
    println!("FIN\n");

    Ok(())
}

fn play_story(registry: &CallRegistry, story: &Story) {
    let mut store = MemoryStore::new();
    store.month = 1;

    let mut runner = Runner::new(registry, &mut store);
    let mut scene = runner.start(story);

    loop {
        println!("{}\n", scene.text);

        let choices = runner.visible_choices(story, &scene);
        if choices.is_empty() {
            break;
        }

        let labels: Vec<String> = choices
            .iter()
            .map(|choice| runner.button_text(story, &scene, *choice))
            .collect();

        let selection = ask_user_for_choice(&labels).unwrap_or_else(|| {
            println!("Exiting program.");
            exit(0);
        });

        println!("");
        runner.choose(story, &mut scene, choices[selection]);
    }

    runner.mark_executed(story);

    for message in runner.logger.iter() {
        eprintln!("{}", message);
    }
}

fn ask_user_for_choice(labels: &[String]) -> Option<usize> {
    println!("Choose:");

    for (i, label) in labels.iter().enumerate() {
        println!("  {}. {}", i + 1, label);
    }

    println!("     ---");
    println!("  0. Exit story");
    println!("");

    loop {
        let mut input = String::new();
        io::stdin().read_line(&mut input).unwrap();

        match input.trim().parse::<usize>() {
            Ok(0) => {
                return None;
            }
            Ok(i) if i > 0 && i <= labels.len() => {
                return Some(i - 1);
            }
            _ => {
                println!("invalid choice, try again");
            }
        }
    }
}
